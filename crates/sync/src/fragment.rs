//! Splitting pushes into fragments.

use crate::config::SyncConfig;
use blueprint_messages::{PushTemplateUpdate, TemplateFragment};
use blueprint_types::{PayloadHash, TemplateId};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors raised while fragmenting an outbound push.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    /// The payload needs more fragments than the receiver will accept.
    #[error("Payload of {size} bytes needs {needed} fragments, limit is {limit}")]
    TooManyFragments { size: usize, needed: u64, limit: u32 },

    /// The payload is larger than the receiver will reassemble.
    #[error("Payload of {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// Splits pushes into ordered fragments, stamping each push with a fresh
/// sequence number.
///
/// One fragmenter is used per session. Sequence numbers increase across all
/// identifiers, so a later push for an identifier always carries a higher
/// sequence than an earlier one.
#[derive(Debug)]
pub struct Fragmenter {
    max_fragment_size: usize,
    max_fragments: u32,
    max_payload_size: usize,
    next_sequence: AtomicU64,
}

impl Fragmenter {
    /// Payloads are limited only by what `max_fragments` fragments can carry.
    pub fn new(max_fragment_size: usize, max_fragments: u32) -> Self {
        let max_fragment_size = max_fragment_size.max(1);
        Self {
            max_fragment_size,
            max_fragments,
            max_payload_size: max_fragment_size.saturating_mul(max_fragments as usize),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Fragmenter producing only pushes a [`Reassembler`](crate::Reassembler)
    /// on the same config will accept.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
            ..Self::new(config.max_fragment_size, config.max_fragments)
        }
    }

    /// Split a push. An empty payload yields exactly one empty fragment.
    pub fn split_push(&self, push: &PushTemplateUpdate) -> Result<Vec<TemplateFragment>, FragmentError> {
        self.split(push.template_id, &push.payload)
    }

    /// Split `payload` for `template_id`.
    pub fn split(&self, template_id: TemplateId, payload: &[u8]) -> Result<Vec<TemplateFragment>, FragmentError> {
        let needed = payload.len().div_ceil(self.max_fragment_size).max(1);
        if needed as u64 > self.max_fragments as u64 {
            return Err(FragmentError::TooManyFragments {
                size: payload.len(),
                needed: needed as u64,
                limit: self.max_fragments,
            });
        }
        if payload.len() > self.max_payload_size {
            return Err(FragmentError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_size,
            });
        }

        let total = needed as u32;
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let payload_hash = PayloadHash::of(payload);

        if payload.is_empty() {
            return Ok(vec![TemplateFragment {
                template_id,
                sequence,
                index: 0,
                total,
                payload_hash,
                data: Vec::new(),
            }]);
        }

        Ok(payload
            .chunks(self.max_fragment_size)
            .enumerate()
            .map(|(index, chunk)| TemplateFragment {
                template_id,
                sequence,
                index: index as u32,
                total,
                payload_hash,
                data: chunk.to_vec(),
            })
            .collect())
    }

    /// Sequence number the next push will carry.
    pub fn peek_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::Relaxed)
    }
}
