//! Template keys.
//!
//! A key either already carries its identifier or obtains one lazily from the
//! allocator the first time it is resolved, then keeps it for the rest of its
//! life.

use crate::error::{AllocationError, PlaceholderError};
use blueprint_types::{Template, TemplateId};
use parking_lot::Mutex;

/// A reference to a template, resolvable to a [`TemplateId`].
pub trait TemplateKey: Send + Sync {
    /// Resolve to an identifier, calling `allocate` only if the key has none yet.
    ///
    /// Resolution is idempotent: once a key has an identifier it returns that
    /// same identifier on every later call.
    fn resolve(
        &self,
        allocate: &dyn Fn() -> Result<TemplateId, AllocationError>,
    ) -> Result<TemplateId, AllocationError>;

    /// Build the empty stand-in cached on a miss for `id`.
    fn create_placeholder(&self, id: TemplateId) -> Result<Template, PlaceholderError> {
        Ok(Template::placeholder(id))
    }
}

/// Key wrapping a known identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentifiedKey(pub TemplateId);

impl IdentifiedKey {
    pub fn new(id: TemplateId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> TemplateId {
        self.0
    }
}

impl From<TemplateId> for IdentifiedKey {
    fn from(id: TemplateId) -> Self {
        Self(id)
    }
}

impl TemplateKey for IdentifiedKey {
    fn resolve(
        &self,
        _allocate: &dyn Fn() -> Result<TemplateId, AllocationError>,
    ) -> Result<TemplateId, AllocationError> {
        Ok(self.0)
    }
}

/// Key for a template that has no identifier yet.
///
/// The first resolution allocates; concurrent first resolutions are
/// serialized so the key never allocates twice. A failed allocation leaves
/// the key unresolved.
#[derive(Debug, Default)]
pub struct PendingKey {
    resolved: Mutex<Option<TemplateId>>,
}

impl PendingKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identifier, if the key has been resolved.
    pub fn resolved(&self) -> Option<TemplateId> {
        *self.resolved.lock()
    }
}

impl TemplateKey for PendingKey {
    fn resolve(
        &self,
        allocate: &dyn Fn() -> Result<TemplateId, AllocationError>,
    ) -> Result<TemplateId, AllocationError> {
        let mut resolved = self.resolved.lock();
        if let Some(id) = *resolved {
            return Ok(id);
        }
        let id = allocate()?;
        *resolved = Some(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_identified_key_never_allocates() {
        let calls = AtomicU32::new(0);
        let allocate = || -> Result<TemplateId, AllocationError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(TemplateId(1))
        };

        let key = IdentifiedKey(TemplateId(77));
        assert_eq!(key.resolve(&allocate), Ok(TemplateId(77)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pending_key_allocates_once() {
        let next = AtomicU32::new(10);
        let allocate = || -> Result<TemplateId, AllocationError> {
            Ok(TemplateId(next.fetch_add(1, Ordering::SeqCst) as u128))
        };

        let key = PendingKey::new();
        assert_eq!(key.resolved(), None);

        let first = key.resolve(&allocate).unwrap();
        let second = key.resolve(&allocate).unwrap();
        assert_eq!(first, TemplateId(10));
        assert_eq!(first, second);
        assert_eq!(key.resolved(), Some(first));
        assert_eq!(next.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_pending_key_stays_unresolved_on_failure() {
        let key = PendingKey::new();
        let failing = || -> Result<TemplateId, AllocationError> {
            Err(AllocationError::Exhausted { attempts: 3 })
        };
        assert!(key.resolve(&failing).is_err());
        assert_eq!(key.resolved(), None);

        let succeeding = || -> Result<TemplateId, AllocationError> { Ok(TemplateId(4)) };
        assert_eq!(key.resolve(&succeeding), Ok(TemplateId(4)));
    }

    #[test]
    fn test_default_placeholder_is_tagged() {
        let placeholder = PendingKey::new().create_placeholder(TemplateId(8)).unwrap();
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.id(), TemplateId(8));
    }
}
