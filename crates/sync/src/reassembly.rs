//! Reassembling pushed fragments.
//!
//! One partial push is buffered per identifier. Fragments may arrive in any
//! order and fragments for different identifiers may interleave freely. A
//! fragment with a higher sequence than the buffered push replaces it; lower
//! sequences, and sequences already completed or discarded, are dropped.
//!
//! A malformed sequence is discarded whole. Nothing partial or corrupt is
//! ever returned.

use crate::config::SyncConfig;
use blueprint_messages::{PushTemplateUpdate, TemplateFragment};
use blueprint_types::{PayloadHash, TemplateId};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Why a fragment sequence was thrown away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscardReason {
    #[error("Invalid fragment count {total}")]
    InvalidTotal { total: u32 },

    #[error("Fragment index {index} out of range for {total} fragments")]
    IndexOutOfRange { index: u32, total: u32 },

    #[error("Fragment count changed mid-sequence: expected {expected}, got {actual}")]
    TotalMismatch { expected: u32, actual: u32 },

    #[error("Duplicate fragment index {index}")]
    DuplicateIndex { index: u32 },

    #[error("Fragments disagree on payload digest")]
    InconsistentHash,

    #[error("Reassembled payload of {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Reassembled payload does not match its digest")]
    CorruptPayload,
}

/// What happened to an accepted fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyOutcome {
    /// Buffered; more fragments are needed.
    Incomplete { received: u32, total: u32 },
    /// The last missing fragment arrived and the payload verified.
    Complete(PushTemplateUpdate),
    /// The fragment belongs to a superseded or finished sequence.
    Stale,
    /// The sequence was malformed and has been dropped.
    Discarded(DiscardReason),
}

#[derive(Debug)]
struct PartialPush {
    sequence: u64,
    total: u32,
    payload_hash: PayloadHash,
    slots: Vec<Option<Vec<u8>>>,
    received: u32,
    bytes: usize,
    last_update: Duration,
}

impl PartialPush {
    fn new(fragment: &TemplateFragment, now: Duration) -> Self {
        Self {
            sequence: fragment.sequence,
            total: fragment.total,
            payload_hash: fragment.payload_hash,
            slots: vec![None; fragment.total as usize],
            received: 0,
            bytes: 0,
            last_update: now,
        }
    }

    fn is_complete(&self) -> bool {
        self.received == self.total
    }

    fn into_payload(self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.bytes);
        for slot in self.slots.into_iter().flatten() {
            payload.extend_from_slice(&slot);
        }
        payload
    }
}

/// Per-identifier reassembly buffers for inbound pushes.
#[derive(Debug)]
pub struct Reassembler {
    config: SyncConfig,
    partials: HashMap<TemplateId, PartialPush>,
    /// Highest sequence per identifier that completed or was discarded.
    retired: HashMap<TemplateId, u64>,
}

impl Reassembler {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            partials: HashMap::new(),
            retired: HashMap::new(),
        }
    }

    /// Feed one fragment received at `now`.
    pub fn accept(&mut self, fragment: TemplateFragment, now: Duration) -> ReassemblyOutcome {
        let id = fragment.template_id;

        if self
            .retired
            .get(&id)
            .is_some_and(|&retired| fragment.sequence <= retired)
        {
            trace!(template_id = %id, sequence = fragment.sequence, "Fragment for finished sequence");
            return ReassemblyOutcome::Stale;
        }

        if let Some(partial) = self.partials.get(&id) {
            if fragment.sequence < partial.sequence {
                trace!(template_id = %id, sequence = fragment.sequence, "Fragment for superseded sequence");
                return ReassemblyOutcome::Stale;
            }
            if fragment.sequence > partial.sequence {
                debug!(
                    template_id = %id,
                    old_sequence = partial.sequence,
                    new_sequence = fragment.sequence,
                    "Newer push supersedes partial reassembly"
                );
                let old_sequence = partial.sequence;
                self.partials.remove(&id);
                self.retire(id, old_sequence);
            }
        }

        if fragment.total == 0 || fragment.total > self.config.max_fragments {
            return self.discard(
                id,
                fragment.sequence,
                DiscardReason::InvalidTotal {
                    total: fragment.total,
                },
            );
        }
        if fragment.index >= fragment.total {
            return self.discard(
                id,
                fragment.sequence,
                DiscardReason::IndexOutOfRange {
                    index: fragment.index,
                    total: fragment.total,
                },
            );
        }

        let partial = self
            .partials
            .entry(id)
            .or_insert_with(|| PartialPush::new(&fragment, now));

        let rejection = if partial.total != fragment.total {
            Some(DiscardReason::TotalMismatch {
                expected: partial.total,
                actual: fragment.total,
            })
        } else if partial.payload_hash != fragment.payload_hash {
            Some(DiscardReason::InconsistentHash)
        } else if partial.slots[fragment.index as usize].is_some() {
            Some(DiscardReason::DuplicateIndex {
                index: fragment.index,
            })
        } else if partial.bytes + fragment.data.len() > self.config.max_payload_size {
            Some(DiscardReason::PayloadTooLarge {
                size: partial.bytes + fragment.data.len(),
                limit: self.config.max_payload_size,
            })
        } else {
            None
        };
        if let Some(reason) = rejection {
            return self.discard(id, fragment.sequence, reason);
        }

        partial.bytes += fragment.data.len();
        partial.received += 1;
        partial.last_update = now;
        partial.slots[fragment.index as usize] = Some(fragment.data);

        if !partial.is_complete() {
            return ReassemblyOutcome::Incomplete {
                received: partial.received,
                total: partial.total,
            };
        }

        let Some(partial) = self.partials.remove(&id) else {
            return ReassemblyOutcome::Stale;
        };
        let sequence = partial.sequence;
        let digest = PayloadHash::of_parts(partial.slots.iter().flatten().map(Vec::as_slice));
        if digest != partial.payload_hash {
            return self.discard(id, sequence, DiscardReason::CorruptPayload);
        }
        let payload = partial.into_payload();

        self.retire(id, sequence);
        debug!(template_id = %id, sequence, bytes = payload.len(), "Reassembled template push");
        ReassemblyOutcome::Complete(PushTemplateUpdate::new(id, payload))
    }

    /// Drop partial pushes that have not progressed within the reassembly
    /// timeout. Returns the identifiers dropped.
    pub fn expire_stale(&mut self, now: Duration) -> Vec<TemplateId> {
        let timeout = self.config.reassembly_timeout;
        let expired: Vec<(TemplateId, u64)> = self
            .partials
            .iter()
            .filter(|(_, p)| now.saturating_sub(p.last_update) >= timeout)
            .map(|(id, p)| (*id, p.sequence))
            .collect();

        for (id, sequence) in &expired {
            warn!(template_id = %id, sequence, "Partial template push timed out");
            self.partials.remove(id);
            self.retire(*id, *sequence);
        }

        expired.into_iter().map(|(id, _)| id).collect()
    }

    /// Forget all buffers and sequence history. Session teardown only.
    pub fn reset(&mut self) {
        self.partials.clear();
        self.retired.clear();
    }

    /// Number of identifiers with a partial push buffered.
    pub fn pending(&self) -> usize {
        self.partials.len()
    }

    fn discard(&mut self, id: TemplateId, sequence: u64, reason: DiscardReason) -> ReassemblyOutcome {
        warn!(template_id = %id, sequence, reason = %reason, "Discarding fragment sequence");
        if self.partials.get(&id).is_some_and(|p| p.sequence == sequence) {
            self.partials.remove(&id);
        }
        self.retire(id, sequence);
        ReassemblyOutcome::Discarded(reason)
    }

    fn retire(&mut self, id: TemplateId, sequence: u64) {
        let retired = self.retired.entry(id).or_insert(sequence);
        if sequence > *retired {
            *retired = sequence;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragmenter;
    use blueprint_test_helpers::payload_of_len;
    use tracing_test::traced_test;

    const ID: TemplateId = TemplateId(0xabc);

    fn reassembler() -> Reassembler {
        Reassembler::new(SyncConfig::default())
    }

    fn fragments(fragmenter: &Fragmenter, id: TemplateId, len: usize) -> Vec<TemplateFragment> {
        fragmenter.split(id, &payload_of_len(len)).unwrap()
    }

    fn complete(outcome: ReassemblyOutcome) -> PushTemplateUpdate {
        match outcome {
            ReassemblyOutcome::Complete(push) => push,
            other => panic!("Expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn test_reverse_order_reassembles_exactly() {
        let fragmenter = Fragmenter::new(64, 64);
        let payload = payload_of_len(1000);
        let mut parts = fragmenter.split(ID, &payload).unwrap();
        assert_eq!(parts.len(), 16);
        parts.reverse();

        let mut reassembler = reassembler();
        let last = parts.pop().unwrap();
        for part in parts {
            assert!(matches!(
                reassembler.accept(part, Duration::ZERO),
                ReassemblyOutcome::Incomplete { total: 16, .. }
            ));
        }

        let push = complete(reassembler.accept(last, Duration::ZERO));
        assert_eq!(push.template_id, ID);
        assert_eq!(push.payload, payload);
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn test_interleaved_identifiers() {
        let fragmenter = Fragmenter::new(10, 64);
        let other = TemplateId(0xdef);
        let a = fragments(&fragmenter, ID, 25);
        let b = fragments(&fragmenter, other, 25);

        let mut reassembler = reassembler();
        let mut done = Vec::new();
        for (x, y) in a.into_iter().zip(b) {
            for outcome in [
                reassembler.accept(x, Duration::ZERO),
                reassembler.accept(y, Duration::ZERO),
            ] {
                if let ReassemblyOutcome::Complete(push) = outcome {
                    done.push(push.template_id);
                }
            }
        }
        assert_eq!(done, vec![ID, other]);
    }

    #[traced_test]
    #[test]
    fn test_newer_sequence_supersedes_partial() {
        let fragmenter = Fragmenter::new(10, 64);
        let old = fragments(&fragmenter, ID, 30);
        let new = fragmenter.split(ID, b"fresh").unwrap();

        let mut reassembler = reassembler();
        reassembler.accept(old[0].clone(), Duration::ZERO);
        let push = complete(reassembler.accept(new[0].clone(), Duration::ZERO));
        assert_eq!(push.payload, b"fresh");

        // Late fragments of the superseded push never produce anything.
        assert_eq!(reassembler.accept(old[1].clone(), Duration::ZERO), ReassemblyOutcome::Stale);
        assert_eq!(reassembler.accept(old[2].clone(), Duration::ZERO), ReassemblyOutcome::Stale);
        assert_eq!(reassembler.pending(), 0);
        assert!(logs_contain("Newer push supersedes partial reassembly"));
    }

    #[test]
    fn test_older_sequence_is_ignored_while_newer_buffers() {
        let fragmenter = Fragmenter::new(10, 64);
        let old = fragments(&fragmenter, ID, 20);
        let new = fragments(&fragmenter, ID, 20);

        let mut reassembler = reassembler();
        reassembler.accept(new[0].clone(), Duration::ZERO);
        assert_eq!(reassembler.accept(old[0].clone(), Duration::ZERO), ReassemblyOutcome::Stale);
        let push = complete(reassembler.accept(new[1].clone(), Duration::ZERO));
        assert_eq!(push.payload, payload_of_len(20));
    }

    #[traced_test]
    #[test]
    fn test_duplicate_index_discards_sequence() {
        let fragmenter = Fragmenter::new(10, 64);
        let parts = fragments(&fragmenter, ID, 30);

        let mut reassembler = reassembler();
        reassembler.accept(parts[0].clone(), Duration::ZERO);
        assert_eq!(
            reassembler.accept(parts[0].clone(), Duration::ZERO),
            ReassemblyOutcome::Discarded(DiscardReason::DuplicateIndex { index: 0 })
        );
        assert_eq!(reassembler.pending(), 0);

        // Remaining fragments of the discarded sequence cannot revive it.
        assert_eq!(reassembler.accept(parts[1].clone(), Duration::ZERO), ReassemblyOutcome::Stale);
        assert_eq!(reassembler.accept(parts[2].clone(), Duration::ZERO), ReassemblyOutcome::Stale);
    }

    #[test]
    fn test_total_mismatch_discards_sequence() {
        let fragmenter = Fragmenter::new(10, 64);
        let parts = fragments(&fragmenter, ID, 30);

        let mut reassembler = reassembler();
        reassembler.accept(parts[0].clone(), Duration::ZERO);

        let mut forged = parts[1].clone();
        forged.total = 4;
        assert_eq!(
            reassembler.accept(forged, Duration::ZERO),
            ReassemblyOutcome::Discarded(DiscardReason::TotalMismatch {
                expected: 3,
                actual: 4
            })
        );
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn test_malformed_fragment_headers() {
        let fragmenter = Fragmenter::new(10, 64);
        let mut reassembler = reassembler();

        let mut zero = fragmenter.split(ID, b"x").unwrap().remove(0);
        zero.total = 0;
        assert_eq!(
            reassembler.accept(zero, Duration::ZERO),
            ReassemblyOutcome::Discarded(DiscardReason::InvalidTotal { total: 0 })
        );

        let mut out_of_range = fragmenter.split(ID, b"y").unwrap().remove(0);
        out_of_range.index = 1;
        assert_eq!(
            reassembler.accept(out_of_range, Duration::ZERO),
            ReassemblyOutcome::Discarded(DiscardReason::IndexOutOfRange { index: 1, total: 1 })
        );
    }

    #[test]
    fn test_corrupt_payload_is_never_returned() {
        let fragmenter = Fragmenter::new(10, 64);
        let mut parts = fragments(&fragmenter, ID, 20);
        parts[1].data[0] ^= 0xff;

        let mut reassembler = reassembler();
        reassembler.accept(parts[0].clone(), Duration::ZERO);
        assert_eq!(
            reassembler.accept(parts[1].clone(), Duration::ZERO),
            ReassemblyOutcome::Discarded(DiscardReason::CorruptPayload)
        );
    }

    #[test]
    fn test_inconsistent_digest_discards() {
        let fragmenter = Fragmenter::new(10, 64);
        let parts = fragments(&fragmenter, ID, 20);

        let mut reassembler = reassembler();
        reassembler.accept(parts[0].clone(), Duration::ZERO);
        let mut forged = parts[1].clone();
        forged.payload_hash = PayloadHash::of(b"something else");
        assert_eq!(
            reassembler.accept(forged, Duration::ZERO),
            ReassemblyOutcome::Discarded(DiscardReason::InconsistentHash)
        );
    }

    #[test]
    fn test_oversized_payload_discards() {
        let config = SyncConfig {
            max_payload_size: 15,
            ..SyncConfig::with_fragment_size(10)
        };
        let fragmenter = Fragmenter::new(10, 64);
        let parts = fragments(&fragmenter, ID, 20);

        let mut reassembler = Reassembler::new(config);
        reassembler.accept(parts[0].clone(), Duration::ZERO);
        assert_eq!(
            reassembler.accept(parts[1].clone(), Duration::ZERO),
            ReassemblyOutcome::Discarded(DiscardReason::PayloadTooLarge { size: 20, limit: 15 })
        );
    }

    #[traced_test]
    #[test]
    fn test_idle_partial_expires() {
        let config = SyncConfig::default().with_reassembly_timeout(Duration::from_secs(30));
        let fragmenter = Fragmenter::new(10, 64);
        let parts = fragments(&fragmenter, ID, 20);

        let mut reassembler = Reassembler::new(config);
        reassembler.accept(parts[0].clone(), Duration::from_secs(1));

        assert!(reassembler.expire_stale(Duration::from_secs(30)).is_empty());
        assert_eq!(reassembler.expire_stale(Duration::from_secs(31)), vec![ID]);
        assert_eq!(reassembler.pending(), 0);
        assert_eq!(
            reassembler.accept(parts[1].clone(), Duration::from_secs(32)),
            ReassemblyOutcome::Stale
        );
        assert!(logs_contain("Partial template push timed out"));
    }

    #[test]
    fn test_reset_forgets_sequence_history() {
        let fragmenter = Fragmenter::new(10, 64);
        let parts = fragmenter.split(ID, b"once").unwrap();

        let mut reassembler = reassembler();
        complete(reassembler.accept(parts[0].clone(), Duration::ZERO));
        assert_eq!(reassembler.accept(parts[0].clone(), Duration::ZERO), ReassemblyOutcome::Stale);

        reassembler.reset();
        complete(reassembler.accept(parts[0].clone(), Duration::ZERO));
    }

    #[test]
    fn test_digest_covers_slots_in_index_order() {
        let fragmenter = Fragmenter::new(10, 64);
        let mut parts = fragments(&fragmenter, ID, 30);
        // Same bytes overall, but slots 0 and 1 swapped.
        let first = parts[0].data.clone();
        parts[0].data = parts[1].data.clone();
        parts[1].data = first;
        parts.reverse();

        let mut reassembler = reassembler();
        let outcomes: Vec<_> = parts
            .into_iter()
            .map(|part| reassembler.accept(part, Duration::ZERO))
            .collect();
        assert_eq!(
            outcomes.last(),
            Some(&ReassemblyOutcome::Discarded(DiscardReason::CorruptPayload))
        );
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn test_sequences_beyond_u32_range_still_supersede() {
        let fragmenter = Fragmenter::new(10, 64);
        let mut old = fragmenter.split(ID, b"old").unwrap();
        let mut new = fragmenter.split(ID, b"new").unwrap();
        old[0].sequence = u32::MAX as u64;
        new[0].sequence = u32::MAX as u64 + 1;

        let mut reassembler = reassembler();
        assert_eq!(complete(reassembler.accept(old[0].clone(), Duration::ZERO)).payload, b"old");
        assert_eq!(complete(reassembler.accept(new[0].clone(), Duration::ZERO)).payload, b"new");
        assert_eq!(reassembler.accept(old[0].clone(), Duration::ZERO), ReassemblyOutcome::Stale);
    }
}
