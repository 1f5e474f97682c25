//! Template payloads.

use crate::{PayloadHash, TemplateId};
use sbor::prelude::*;

/// Whether a template holds real content or stands in for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub enum TemplateKind {
    /// Empty stand-in inserted on a cache miss while the fetch is pending.
    Placeholder,
    /// Populated from a local `set` or a received push.
    Materialized,
}

/// An identifier-tagged build blueprint.
///
/// The payload is opaque to the cache and the sync protocol; only its
/// bytes and digest are ever inspected.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Template {
    id: TemplateId,
    kind: TemplateKind,
    payload: Vec<u8>,
}

impl Template {
    /// Empty placeholder for `id`.
    pub fn placeholder(id: TemplateId) -> Self {
        Self {
            id,
            kind: TemplateKind::Placeholder,
            payload: Vec::new(),
        }
    }

    /// Materialized template carrying `payload`.
    pub fn materialized(id: TemplateId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            kind: TemplateKind::Materialized,
            payload: payload.into(),
        }
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == TemplateKind::Placeholder
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Digest of the payload.
    pub fn payload_hash(&self) -> PayloadHash {
        PayloadHash::of(&self.payload)
    }

    /// Re-tag this template with another identifier.
    pub fn with_id(mut self, id: TemplateId) -> Self {
        self.id = id;
        self
    }

    /// Consume and return the payload bytes.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
