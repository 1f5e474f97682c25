//! Identifier → template cache with idle eviction and single-flight fetches.
//!
//! # Miss path
//!
//! ```text
//! get_or_request(id)
//!     │  lock entries
//!     ├── live entry ──────────────► refresh last access, return it
//!     └── absent / idle-expired
//!             1. build placeholder   (failure: nothing inserted, nothing sent)
//!             2. insert placeholder
//!             3. send RequestTemplate(id)
//!             4. return placeholder
//!     │  unlock
//! ```
//!
//! All four steps run under the same lock, so concurrent callers for one
//! identifier either see the inserted placeholder or perform the whole miss
//! themselves. There is never a second request nor a second placeholder.

use crate::config::CacheConfig;
use crate::error::{CacheError, PlaceholderError};
use crate::stats::{CacheCounters, CacheStats};
use blueprint_core::{MessageSink, OutboundMessage};
use blueprint_messages::RequestTemplate;
use blueprint_types::{Clock, Template, TemplateId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Outstanding fetch for a placeholder.
#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    /// When the latest `RequestTemplate` went out.
    requested_at: Duration,
    /// Re-sends performed so far.
    retries: u32,
}

#[derive(Debug)]
struct CacheEntry {
    template: Arc<Template>,
    last_access: Duration,
    /// Set while the entry is a placeholder awaiting a push.
    fetch: Option<PendingFetch>,
}

impl CacheEntry {
    fn is_idle(&self, now: Duration, idle_timeout: Duration) -> bool {
        now.saturating_sub(self.last_access) >= idle_timeout
    }
}

/// Session-scoped template cache.
pub struct TemplateCache {
    entries: Mutex<HashMap<TemplateId, CacheEntry>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn MessageSink>,
    counters: CacheCounters,
}

impl TemplateCache {
    /// Create an empty cache.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
            clock,
            sink,
            counters: CacheCounters::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the live entry for `id`, or insert a placeholder built by
    /// `make_placeholder` and request the real template from the remote peer.
    ///
    /// Never waits on the network.
    pub fn get_or_request<F>(&self, id: TemplateId, make_placeholder: F) -> Result<Arc<Template>, CacheError>
    where
        F: FnOnce(TemplateId) -> Result<Template, PlaceholderError>,
    {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(&id) {
            if !entry.is_idle(now, self.config.idle_timeout) {
                entry.last_access = now;
                self.counters.hit();
                trace!(template_id = %id, "Cache hit");
                return Ok(entry.template.clone());
            }
        }
        if entries.remove(&id).is_some() {
            self.counters.evicted(1);
            debug!(template_id = %id, "Evicted idle template on access");
        }

        let placeholder =
            make_placeholder(id).map_err(|source| CacheError::Placeholder { id, source })?;
        let template = Arc::new(placeholder);

        entries.insert(
            id,
            CacheEntry {
                template: template.clone(),
                last_access: now,
                fetch: Some(PendingFetch {
                    requested_at: now,
                    retries: 0,
                }),
            },
        );
        self.counters.miss();
        debug!(template_id = %id, "Cache miss, requesting template");
        self.send_request(id);

        Ok(template)
    }

    /// Insert or replace the entry for `id`. Sends nothing.
    pub fn insert(&self, id: TemplateId, template: Template) -> Arc<Template> {
        let now = self.clock.now();
        let template = Arc::new(template);
        let previous = self.entries.lock().insert(
            id,
            CacheEntry {
                template: template.clone(),
                last_access: now,
                fetch: None,
            },
        );

        debug!(
            template_id = %id,
            bytes = template.len(),
            replaced_placeholder = previous.as_ref().is_some_and(|e| e.fetch.is_some()),
            "Stored template"
        );
        template
    }

    /// Live entry for `id`, refreshing its recency. Never requests anything.
    pub fn peek(&self, id: TemplateId) -> Option<Arc<Template>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(&id) {
            if !entry.is_idle(now, self.config.idle_timeout) {
                entry.last_access = now;
                return Some(entry.template.clone());
            }
        }
        if entries.remove(&id).is_some() {
            self.counters.evicted(1);
        }
        None
    }

    /// Whether a live entry exists, without refreshing it.
    pub fn contains(&self, id: TemplateId) -> bool {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(&id)
            .is_some_and(|e| !e.is_idle(now, self.config.idle_timeout))
    }

    /// Whether `id` is a placeholder still waiting for a push.
    pub fn is_pending(&self, id: TemplateId) -> bool {
        self.entries
            .lock()
            .get(&id)
            .is_some_and(|e| e.fetch.is_some())
    }

    /// Send a `RequestTemplate` for `id` without touching its entry.
    pub fn request(&self, id: TemplateId) {
        debug!(template_id = %id, "Requesting template update");
        self.send_request(id);
    }

    /// Drop every entry whose idle window has elapsed. Returns how many went.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let idle_timeout = self.config.idle_timeout;
        let mut entries = self.entries.lock();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_idle(now, idle_timeout));
        let evicted = before - entries.len();

        if evicted > 0 {
            self.counters.evicted(evicted);
            debug!(evicted, remaining = entries.len(), "Swept idle templates");
        }
        evicted
    }

    /// Re-send requests for placeholders that have waited longer than the
    /// request timeout. Returns the identifiers re-requested.
    ///
    /// Once a placeholder has used its retry budget it stops being tracked
    /// and simply waits for a late push or idle eviction.
    pub fn retry_stalled_requests(&self) -> Vec<TemplateId> {
        let now = self.clock.now();
        let mut retried = Vec::new();
        let mut entries = self.entries.lock();

        for (id, entry) in entries.iter_mut() {
            if entry.is_idle(now, self.config.idle_timeout) {
                continue;
            }
            let Some(fetch) = entry.fetch.as_mut() else {
                continue;
            };
            if now.saturating_sub(fetch.requested_at) < self.config.request_timeout {
                continue;
            }

            if fetch.retries >= self.config.max_request_retries {
                warn!(
                    template_id = %id,
                    retries = fetch.retries,
                    "No response to template request, giving up until eviction"
                );
                entry.fetch = None;
                continue;
            }

            fetch.retries += 1;
            fetch.requested_at = now;
            debug!(template_id = %id, retry = fetch.retries, "Re-sending stalled template request");
            self.send_request(*id);
            retried.push(*id);
        }

        retried
    }

    /// Evict everything. Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let cleared = entries.len();
        entries.clear();
        cleared
    }

    /// Number of entries, including idle ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Activity counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn send_request(&self, id: TemplateId) {
        self.counters.request_sent();
        self.sink
            .send(OutboundMessage::RequestTemplate(RequestTemplate::new(id)));
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
