//! Public façade over the allocator and cache.

use crate::allocator::IdentifierAllocator;
use crate::cache::TemplateCache;
use crate::config::CacheConfig;
use crate::error::{AllocationError, CacheError};
use crate::key::{IdentifiedKey, TemplateKey};
use crate::stats::CacheStats;
use blueprint_core::{MessageSink, OutboundMessage};
use blueprint_messages::PushTemplateUpdate;
use blueprint_types::{Clock, SystemClock, Template, TemplateId};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Idle entries swept.
    pub evicted: usize,
    /// Placeholders whose request was re-sent.
    pub retried: Vec<TemplateId>,
}

/// Session-scoped template provider.
///
/// Constructed once per connection to a remote peer and shared by reference
/// (typically `Arc<TemplateProvider>`) between the foreground request path and
/// the inbound message path. [`TemplateProvider::clear`] ends the session.
pub struct TemplateProvider {
    allocator: IdentifierAllocator,
    cache: TemplateCache,
    sink: Arc<dyn MessageSink>,
}

impl TemplateProvider {
    /// Create a provider on wall-clock time with an entropy-seeded allocator.
    pub fn new(config: CacheConfig, sink: Arc<dyn MessageSink>) -> Self {
        Self::with_clock(config, sink, Arc::new(SystemClock::new()))
    }

    /// Create a provider on the given clock.
    pub fn with_clock(config: CacheConfig, sink: Arc<dyn MessageSink>, clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(config, sink, clock, ChaCha20Rng::from_entropy())
    }

    /// Create a provider with a deterministic identifier sequence.
    pub fn seeded(
        config: CacheConfig,
        sink: Arc<dyn MessageSink>,
        clock: Arc<dyn Clock>,
        seed: u64,
    ) -> Self {
        Self::with_parts(config, sink, clock, ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_parts(
        config: CacheConfig,
        sink: Arc<dyn MessageSink>,
        clock: Arc<dyn Clock>,
        rng: ChaCha20Rng,
    ) -> Self {
        let allocator =
            IdentifierAllocator::with_rng(sink.clone(), config.max_allocation_attempts, rng);
        let cache = TemplateCache::new(config, clock, sink.clone());
        Self {
            allocator,
            cache,
            sink,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Consumer API
    // ═══════════════════════════════════════════════════════════════════════

    /// Template for `key`, or a placeholder while the real one is fetched.
    ///
    /// Repeated calls before the push lands return the same placeholder and
    /// send no further requests.
    pub fn get(&self, key: &dyn TemplateKey) -> Result<Arc<Template>, CacheError> {
        let id = self.resolve(key)?;
        self.cache.get_or_request(id, |id| key.create_placeholder(id))
    }

    /// Store `template` under `key`, replacing whatever was cached.
    ///
    /// The template is re-tagged with the key's identifier. Marks the
    /// identifier allocated. Sends nothing.
    pub fn set(&self, key: &dyn TemplateKey, template: Template) -> Result<TemplateId, CacheError> {
        let id = self.resolve(key)?;
        self.allocator.mark_allocated(id);
        self.cache.insert(id, template.with_id(id));
        Ok(id)
    }

    /// Ask the remote peer for its copy of `key`'s template. Always `true`.
    pub fn request_update(&self, key: &dyn TemplateKey) -> Result<bool, CacheError> {
        let id = self.resolve(key)?;
        self.cache.request(id);
        Ok(true)
    }

    /// Push the cached template for `key` to the remote peer.
    ///
    /// Returns `false`, sending nothing, when nothing is cached.
    pub fn request_remote_update(&self, key: &dyn TemplateKey) -> Result<bool, CacheError> {
        let id = self.resolve(key)?;
        Ok(self.push(id, false))
    }

    /// Record an identifier the remote peer reserved.
    pub fn on_remote_id_allocated(&self, id: TemplateId) {
        self.allocator.mark_remote_allocated(id);
    }

    /// End the session: evict every entry and forget every reserved identifier.
    ///
    /// Placeholders still waiting for pushes are discarded too, so this belongs
    /// in session teardown only.
    pub fn clear(&self) {
        let evicted = self.cache.clear();
        let forgotten = self.allocator.len();
        self.allocator.reset();
        info!(evicted, forgotten, "Template session cleared");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inbound Path
    // ═══════════════════════════════════════════════════════════════════════

    /// Apply a completed push from the remote peer.
    pub fn apply_push(&self, push: PushTemplateUpdate) -> TemplateId {
        let id = push.template_id;
        self.allocator.mark_allocated(id);
        self.cache.insert(id, push.into_template());
        id
    }

    /// Answer a `RequestTemplate` from the remote peer.
    ///
    /// Only materialized templates are served; returns whether a push was sent.
    pub fn serve_request(&self, id: TemplateId) -> bool {
        self.push(id, true)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Maintenance
    // ═══════════════════════════════════════════════════════════════════════

    /// Sweep idle entries and re-send stalled requests.
    pub fn maintain(&self) -> MaintenanceReport {
        MaintenanceReport {
            evicted: self.cache.evict_expired(),
            retried: self.cache.retry_stalled_requests(),
        }
    }

    /// Resolve a key, allocating a fresh identifier if it needs one.
    pub fn resolve(&self, key: &dyn TemplateKey) -> Result<TemplateId, AllocationError> {
        key.resolve(&|| self.allocator.allocate())
    }

    /// Convenience lookup by identifier.
    pub fn get_by_id(&self, id: TemplateId) -> Result<Arc<Template>, CacheError> {
        self.get(&IdentifiedKey(id))
    }

    pub fn allocator(&self) -> &IdentifierAllocator {
        &self.allocator
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn push(&self, id: TemplateId, materialized_only: bool) -> bool {
        let Some(template) = self.cache.peek(id) else {
            debug!(template_id = %id, "Nothing cached to push");
            return false;
        };
        if materialized_only && template.is_placeholder() {
            debug!(template_id = %id, "Only a placeholder cached, not serving");
            return false;
        }

        debug!(template_id = %id, bytes = template.len(), "Pushing template to remote peer");
        self.sink.send(OutboundMessage::PushTemplate {
            template_id: id,
            template,
        });
        true
    }
}

impl std::fmt::Debug for TemplateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateProvider")
            .field("allocator", &self.allocator)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaceholderError;
    use crate::key::PendingKey;
    use blueprint_test_helpers::{materialized, ManualClock, RecordingSink};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn make_provider() -> (TemplateProvider, Arc<ManualClock>, Arc<RecordingSink>) {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingSink::new());
        let provider = TemplateProvider::seeded(CacheConfig::default(), sink.clone(), clock.clone(), 42);
        (provider, clock, sink)
    }

    /// Key whose placeholder construction always fails.
    struct BrokenKey(TemplateId);

    impl TemplateKey for BrokenKey {
        fn resolve(
            &self,
            _allocate: &dyn Fn() -> Result<TemplateId, AllocationError>,
        ) -> Result<TemplateId, AllocationError> {
            Ok(self.0)
        }

        fn create_placeholder(&self, _id: TemplateId) -> Result<Template, PlaceholderError> {
            Err(PlaceholderError::new("unsupported template format"))
        }
    }

    #[traced_test]
    #[test]
    fn test_get_twice_sends_one_request() {
        let (provider, _, sink) = make_provider();
        let key = IdentifiedKey(TemplateId(1));

        let first = provider.get(&key).unwrap();
        let second = provider.get(&key).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sink.requests_for(TemplateId(1)), 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_pending_key_allocates_and_announces_once() {
        let (provider, _, sink) = make_provider();
        let key = PendingKey::new();

        let first = provider.get(&key).unwrap();
        let second = provider.get(&key).unwrap();
        let id = key.resolved().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), id);
        assert_eq!(sink.allocation_notices(), vec![id]);
        assert_eq!(sink.requests_for(id), 1);
        assert!(provider.allocator().is_allocated(id));
    }

    #[test]
    fn test_shared_pending_key_resolves_once_across_threads() {
        let (provider, _, sink) = make_provider();
        let key = PendingKey::new();

        let placeholders: Vec<Arc<Template>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| provider.get(&key).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let id = key.resolved().unwrap();
        assert_eq!(sink.allocation_notices(), vec![id]);
        assert_eq!(sink.requests_for(id), 1);
        assert!(placeholders.iter().all(|p| Arc::ptr_eq(p, &placeholders[0])));
        assert_eq!(provider.allocator().len(), 1);
    }

    #[test]
    fn test_set_then_get_returns_template() {
        let (provider, _, sink) = make_provider();
        let key = IdentifiedKey(TemplateId(2));
        let template = materialized(TemplateId(2), 128);

        provider.set(&key, template.clone()).unwrap();
        let got = provider.get(&key).unwrap();

        assert_eq!(*got, template);
        assert!(sink.is_empty());
        assert!(provider.allocator().is_allocated(TemplateId(2)));
    }

    #[test]
    fn test_set_with_pending_key_authors_locally() {
        let (provider, _, sink) = make_provider();
        let key = PendingKey::new();

        let id = provider.set(&key, Template::materialized(TemplateId::NIL, b"local".to_vec())).unwrap();
        assert_eq!(key.resolved(), Some(id));
        assert_eq!(sink.allocation_notices(), vec![id]);
        let cached = provider.get(&key).unwrap();
        assert_eq!(cached.payload(), b"local");
        assert_eq!(cached.id(), id);
        assert_eq!(sink.requests_for(id), 0);
    }

    #[test]
    fn test_set_retags_template_with_key_id() {
        let (provider, _, _) = make_provider();
        let key = IdentifiedKey(TemplateId(21));

        provider.set(&key, Template::materialized(TemplateId(99), b"x".to_vec())).unwrap();
        assert_eq!(provider.get(&key).unwrap().id(), TemplateId(21));
        assert!(!provider.cache().contains(TemplateId(99)));
    }

    #[test]
    fn test_request_update_is_fire_and_forget() {
        let (provider, _, sink) = make_provider();
        let key = IdentifiedKey(TemplateId(3));

        assert_eq!(provider.request_update(&key), Ok(true));
        assert_eq!(sink.requests_for(TemplateId(3)), 1);
        assert!(!provider.cache().contains(TemplateId(3)));
    }

    #[test]
    fn test_remote_update_requires_cached_entry() {
        let (provider, _, sink) = make_provider();
        let id = TemplateId(4);
        let key = IdentifiedKey(id);

        assert_eq!(provider.request_remote_update(&key), Ok(false));
        assert!(sink.is_empty());

        let template = materialized(id, 32);
        provider.set(&key, template.clone()).unwrap();
        assert_eq!(provider.request_remote_update(&key), Ok(true));

        let messages = sink.take();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            OutboundMessage::PushTemplate {
                template_id,
                template: pushed,
            } => {
                assert_eq!(*template_id, id);
                assert_eq!(**pushed, template);
            }
            other => panic!("Expected PushTemplate, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_serve_request_skips_placeholders() {
        let (provider, _, sink) = make_provider();
        let id = TemplateId(5);
        provider.get_by_id(id).unwrap();
        sink.take();

        assert!(!provider.serve_request(id));
        assert!(sink.is_empty());

        provider.apply_push(PushTemplateUpdate::new(id, b"walls".to_vec()));
        assert!(provider.serve_request(id));
        assert_eq!(sink.pushes_for(id), 1);
    }

    #[test]
    fn test_apply_push_replaces_placeholder() {
        let (provider, _, sink) = make_provider();
        let id = TemplateId(6);
        assert!(provider.get_by_id(id).unwrap().is_placeholder());

        provider.apply_push(PushTemplateUpdate::new(id, b"roof".to_vec()));
        let got = provider.get_by_id(id).unwrap();
        assert_eq!(got.payload(), b"roof");
        assert_eq!(sink.requests_for(id), 1);
    }

    #[test]
    fn test_remote_allocation_is_recorded_silently() {
        let (provider, _, sink) = make_provider();
        provider.on_remote_id_allocated(TemplateId(7));
        assert!(provider.allocator().is_allocated(TemplateId(7)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_placeholder_failure_wraps_identifier() {
        let (provider, _, sink) = make_provider();
        let err = provider.get(&BrokenKey(TemplateId(8))).unwrap_err();

        assert!(matches!(err, CacheError::Placeholder { id, .. } if id == TemplateId(8)));
        assert!(err.to_string().contains(&TemplateId(8).to_string()));
        assert!(sink.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_clear_resets_session() {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingSink::new());
        let provider =
            TemplateProvider::seeded(CacheConfig::default(), sink.clone(), clock.clone(), 11);

        let key = PendingKey::new();
        provider.set(&key, materialized(TemplateId::NIL, 8)).unwrap();
        let before = key.resolved().unwrap();

        provider.clear();
        assert!(provider.cache().is_empty());
        assert!(provider.allocator().is_empty());
        assert!(logs_contain("Template session cleared"));

        // Fresh miss after the reset.
        sink.take();
        assert!(provider.get(&key).unwrap().is_placeholder());
        assert_eq!(sink.requests_for(before), 1);

        // A provider replaying the same seed after a reset may reuse the value.
        let replay = TemplateProvider::seeded(CacheConfig::default(), sink.clone(), clock, 11);
        assert_eq!(replay.allocator().allocate(), Ok(before));
    }

    #[test]
    fn test_maintain_sweeps_and_retries() {
        let config = CacheConfig::default()
            .with_idle_timeout(Duration::from_secs(60))
            .with_request_retry(Duration::from_secs(5), 1);
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingSink::new());
        let provider = TemplateProvider::seeded(config, sink.clone(), clock.clone(), 3);

        provider.set(&IdentifiedKey(TemplateId(1)), materialized(TemplateId(1), 4)).unwrap();
        clock.advance(Duration::from_secs(30));
        provider.get_by_id(TemplateId(2)).unwrap();
        clock.advance(Duration::from_secs(30));

        let report = provider.maintain();
        assert_eq!(report.evicted, 1);
        assert_eq!(report.retried, vec![TemplateId(2)]);
        assert_eq!(sink.requests_for(TemplateId(2)), 2);
    }
}
