//! Cache configuration.

use std::time::Duration;

/// Configuration for the template cache and identifier allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry may go unaccessed before it is evicted.
    pub idle_timeout: Duration,

    /// How long a placeholder waits for a push before its request is re-sent.
    pub request_timeout: Duration,

    /// Maximum number of re-sends per placeholder. After that the placeholder
    /// waits until idle eviction.
    pub max_request_retries: u32,

    /// Random candidates tried per allocation before giving up.
    pub max_allocation_attempts: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(5),
            max_request_retries: 3,
            max_allocation_attempts: 1024,
        }
    }
}

impl CacheConfig {
    /// Set the idle eviction window.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set the request timeout and retry budget.
    pub fn with_request_retry(mut self, request_timeout: Duration, max_retries: u32) -> Self {
        self.request_timeout = request_timeout;
        self.max_request_retries = max_retries;
        self
    }

    /// Disable request re-sends; placeholders wait until idle eviction.
    pub fn without_request_retry(mut self) -> Self {
        self.max_request_retries = 0;
        self
    }

    /// Set the allocation attempt cap.
    pub fn with_max_allocation_attempts(mut self, attempts: u32) -> Self {
        self.max_allocation_attempts = attempts;
        self
    }
}
