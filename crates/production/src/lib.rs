//! Production runner for template sync sessions.
//!
//! Wires a [`TemplateProvider`](blueprint_cache::TemplateProvider) and a
//! [`SyncHandler`](blueprint_sync::SyncHandler) to an async frame link:
//!
//! - [`network`]: frame codec (`[kind][lz4(sbor)]`) and the channel-backed sink
//! - [`session`]: the per-connection task
//! - [`config`]: TOML configuration
//! - [`telemetry`]: tracing subscriber setup

pub mod config;
pub mod network;
pub mod session;
pub mod telemetry;

pub use config::{ConfigError, PeerConfig};
pub use network::{ChannelSink, CodecError};
pub use session::{link_pair, PeerLink, PeerSession, SessionEnd, SessionSummary};
pub use telemetry::init_tracing;
