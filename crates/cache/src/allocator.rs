//! Collision-free identifier allocation.
//!
//! Each peer draws identifiers at random and tells its remote peer about every
//! one it keeps. Identifiers learned from the remote side are recorded too, so
//! neither peer will ever hand out a value the other already reserved.

use crate::error::AllocationError;
use blueprint_core::{MessageSink, OutboundMessage};
use blueprint_messages::IdentifierAllocated;
use blueprint_types::TemplateId;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Allocated-set and candidate generator, guarded together so that
/// generate-check-insert is one critical section.
struct AllocatorState {
    allocated: HashSet<TemplateId>,
    rng: ChaCha20Rng,
}

/// Produces identifiers that no peer in the session has reserved yet.
pub struct IdentifierAllocator {
    state: Mutex<AllocatorState>,
    sink: Arc<dyn MessageSink>,
    max_attempts: u32,
}

impl IdentifierAllocator {
    /// Create an allocator seeded from OS entropy.
    pub fn new(sink: Arc<dyn MessageSink>, max_attempts: u32) -> Self {
        Self::with_rng(sink, max_attempts, ChaCha20Rng::from_entropy())
    }

    /// Create an allocator drawing candidates from `rng`.
    ///
    /// Used by tests to make candidate sequences reproducible.
    pub fn with_rng(sink: Arc<dyn MessageSink>, max_attempts: u32, rng: ChaCha20Rng) -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                allocated: HashSet::new(),
                rng,
            }),
            sink,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Reserve a fresh identifier and announce it to the remote peer.
    ///
    /// Candidates already in the allocated set are discarded and redrawn,
    /// up to the configured attempt cap.
    pub fn allocate(&self) -> Result<TemplateId, AllocationError> {
        let mut state = self.state.lock();

        for attempt in 1..=self.max_attempts {
            let candidate = TemplateId::random(&mut state.rng);
            if !state.allocated.insert(candidate) {
                trace!(template_id = %candidate, attempt, "Identifier collision, redrawing");
                continue;
            }

            debug!(template_id = %candidate, "Allocated template identifier");
            self.sink
                .send(OutboundMessage::IdentifierAllocated(IdentifierAllocated::new(
                    candidate,
                )));
            return Ok(candidate);
        }

        warn!(
            attempts = self.max_attempts,
            allocated = state.allocated.len(),
            "Identifier allocation exhausted"
        );
        Err(AllocationError::Exhausted {
            attempts: self.max_attempts,
        })
    }

    /// Record an identifier reserved by the remote peer.
    ///
    /// Sends nothing back. Returns `true` if the identifier was not known yet.
    pub fn mark_remote_allocated(&self, id: TemplateId) -> bool {
        let inserted = self.state.lock().allocated.insert(id);
        if inserted {
            debug!(template_id = %id, "Remote peer reserved identifier");
        }
        inserted
    }

    /// Record an identifier used locally without announcing it, e.g. when a
    /// template is stored under a key that already carried its identifier.
    pub fn mark_allocated(&self, id: TemplateId) -> bool {
        self.state.lock().allocated.insert(id)
    }

    /// Check whether an identifier is reserved.
    pub fn is_allocated(&self, id: TemplateId) -> bool {
        self.state.lock().allocated.contains(&id)
    }

    /// Number of reserved identifiers.
    pub fn len(&self) -> usize {
        self.state.lock().allocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().allocated.is_empty()
    }

    /// Forget every reserved identifier. Session teardown only.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let cleared = state.allocated.len();
        state.allocated.clear();
        debug!(cleared, "Reset allocated identifier set");
    }
}

impl std::fmt::Debug for IdentifierAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierAllocator")
            .field("allocated", &self.len())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}
