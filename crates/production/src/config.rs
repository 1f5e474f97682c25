//! Peer configuration loaded from TOML.
//!
//! Every field is optional; omitted fields keep their defaults. Durations
//! are given in milliseconds.
//!
//! ```toml
//! [cache]
//! idle_timeout_ms = 60000
//! request_timeout_ms = 5000
//! max_request_retries = 3
//! max_allocation_attempts = 1024
//!
//! [sync]
//! max_fragment_size = 30000
//! max_fragments = 4096
//! max_payload_size = 67108864
//! reassembly_timeout_ms = 30000
//!
//! maintenance_interval_ms = 1000
//! ```

use crate::network::MAX_FRAGMENT_SIZE;
use blueprint_cache::CacheConfig;
use blueprint_sync::SyncConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading a peer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Everything a [`PeerSession`](crate::PeerSession) needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub cache: CacheConfig,
    pub sync: SyncConfig,
    /// How often the session runs cache and reassembly maintenance.
    pub maintenance_interval: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            sync: SyncConfig::default(),
            maintenance_interval: Duration::from_secs(1),
        }
    }
}

impl PeerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(input)?;
        let config = file.into_config();
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Reject settings the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.max_fragment_size == 0 {
            return Err(ConfigError::Invalid("max_fragment_size must be positive".into()));
        }
        if self.sync.max_fragment_size > MAX_FRAGMENT_SIZE {
            return Err(ConfigError::Invalid(format!(
                "max_fragment_size {} exceeds frame limit {}",
                self.sync.max_fragment_size, MAX_FRAGMENT_SIZE
            )));
        }
        if self.sync.max_fragments == 0 {
            return Err(ConfigError::Invalid("max_fragments must be positive".into()));
        }
        if self.maintenance_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "maintenance_interval_ms must be positive".into(),
            ));
        }
        if self.cache.idle_timeout.is_zero() {
            return Err(ConfigError::Invalid("idle_timeout_ms must be positive".into()));
        }
        if self.cache.max_allocation_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_allocation_attempts must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// File representation
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    cache: CacheSection,
    sync: SyncSection,
    maintenance_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CacheSection {
    idle_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    max_request_retries: Option<u32>,
    max_allocation_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SyncSection {
    max_fragment_size: Option<usize>,
    max_fragments: Option<u32>,
    max_payload_size: Option<usize>,
    reassembly_timeout_ms: Option<u64>,
}

impl ConfigFile {
    fn into_config(self) -> PeerConfig {
        let mut config = PeerConfig::default();

        let cache = &mut config.cache;
        if let Some(ms) = self.cache.idle_timeout_ms {
            cache.idle_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.cache.request_timeout_ms {
            cache.request_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = self.cache.max_request_retries {
            cache.max_request_retries = n;
        }
        if let Some(n) = self.cache.max_allocation_attempts {
            cache.max_allocation_attempts = n;
        }

        let sync = &mut config.sync;
        if let Some(n) = self.sync.max_fragment_size {
            sync.max_fragment_size = n;
        }
        if let Some(n) = self.sync.max_fragments {
            sync.max_fragments = n;
        }
        if let Some(n) = self.sync.max_payload_size {
            sync.max_payload_size = n;
        }
        if let Some(ms) = self.sync.reassembly_timeout_ms {
            sync.reassembly_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = self.maintenance_interval_ms {
            config.maintenance_interval = Duration::from_millis(ms);
        }
        config
    }
}
