//! Sync configuration.

use std::time::Duration;

/// Configuration for template push transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum payload bytes carried by one fragment.
    pub max_fragment_size: usize,

    /// Maximum number of fragments accepted for one push.
    pub max_fragments: u32,

    /// Maximum reassembled payload size in bytes.
    pub max_payload_size: usize,

    /// How long a partial reassembly may sit without receiving a fragment
    /// before it is discarded.
    pub reassembly_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_fragment_size: 30_000,
            max_fragments: 4096,
            max_payload_size: 64 * 1024 * 1024,
            reassembly_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Create a config with a custom fragment size.
    pub fn with_fragment_size(max_fragment_size: usize) -> Self {
        Self {
            max_fragment_size,
            ..Default::default()
        }
    }

    /// Set the reassembly timeout.
    pub fn with_reassembly_timeout(mut self, reassembly_timeout: Duration) -> Self {
        self.reassembly_timeout = reassembly_timeout;
        self
    }
}
