//! Test fixtures shared across the workspace.
//!
//! - [`RecordingSink`] captures outbound messages so tests can count requests
//!   and pushes exactly.
//! - [`ManualClock`] only moves when told to.
//! - [`materialized`] / [`payload_of_len`] build template payloads.

use blueprint_core::{MessageSink, OutboundMessage};
use blueprint_types::{Clock, Template, TemplateId};
use parking_lot::Mutex;
use std::time::Duration;

/// A [`MessageSink`] that records everything sent through it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every message sent so far, in send order.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    /// Number of `RequestTemplate` messages sent for `id`.
    pub fn requests_for(&self, id: TemplateId) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.is_request() && m.template_id() == id)
            .count()
    }

    /// Number of `PushTemplate` messages sent for `id`.
    pub fn pushes_for(&self, id: TemplateId) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.is_push() && m.template_id() == id)
            .count()
    }

    /// Identifiers announced via `IdentifierAllocated`, in send order.
    pub fn allocation_notices(&self) -> Vec<TemplateId> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::IdentifierAllocated(notice) => Some(notice.template_id),
                _ => None,
            })
            .collect()
    }
}

impl MessageSink for RecordingSink {
    fn send(&self, message: OutboundMessage) {
        self.sent.lock().push(message);
    }
}

/// A clock that only advances when [`ManualClock::advance`] is called.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock();
        if to > *now {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Deterministic payload of exactly `len` bytes.
pub fn payload_of_len(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Materialized template with a deterministic payload of `len` bytes.
pub fn materialized(id: TemplateId, len: usize) -> Template {
    Template::materialized(id, payload_of_len(len))
}
