//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` if a
/// global subscriber was already installed or the filter does not parse.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = match EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
    {
        Ok(filter) => filter,
        Err(_) => return false,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
