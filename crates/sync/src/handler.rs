//! Inbound message dispatch.

use crate::config::SyncConfig;
use crate::reassembly::{DiscardReason, ReassemblyOutcome, Reassembler};
use blueprint_cache::{MaintenanceReport, TemplateProvider};
use blueprint_core::InboundMessage;
use blueprint_types::{Clock, TemplateId};
use std::sync::Arc;
use tracing::{debug, info};

/// What an inbound message did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// A completed push was stored in the cache.
    Applied(TemplateId),
    /// A request was answered with a push.
    Served(TemplateId),
    /// A request could not be answered: nothing materialized is cached.
    NotServed(TemplateId),
    /// The remote peer's identifier was recorded.
    Reserved(TemplateId),
    /// A fragment was buffered.
    Buffered { received: u32, total: u32 },
    /// A fragment of a superseded or finished push was dropped.
    Stale,
    /// A malformed push sequence was thrown away.
    Discarded(DiscardReason),
}

/// Applies messages from the remote peer to the local provider.
///
/// Owned by the single task that reads the peer link; the provider it feeds
/// is shared with the foreground request path.
pub struct SyncHandler {
    provider: Arc<TemplateProvider>,
    reassembler: Reassembler,
    clock: Arc<dyn Clock>,
}

impl SyncHandler {
    pub fn new(provider: Arc<TemplateProvider>, config: SyncConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            reassembler: Reassembler::new(config),
            clock,
        }
    }

    pub fn provider(&self) -> &Arc<TemplateProvider> {
        &self.provider
    }

    /// Handle one inbound message.
    pub fn handle(&mut self, message: InboundMessage) -> HandleOutcome {
        match message {
            InboundMessage::RequestTemplate(request) => {
                let id = request.template_id;
                if self.provider.serve_request(id) {
                    HandleOutcome::Served(id)
                } else {
                    debug!(template_id = %id, "Cannot serve template request");
                    HandleOutcome::NotServed(id)
                }
            }
            InboundMessage::IdentifierAllocated(notice) => {
                self.provider.on_remote_id_allocated(notice.template_id);
                HandleOutcome::Reserved(notice.template_id)
            }
            InboundMessage::TemplateFragment(fragment) => {
                let now = self.clock.now();
                match self.reassembler.accept(fragment, now) {
                    ReassemblyOutcome::Complete(push) => {
                        HandleOutcome::Applied(self.provider.apply_push(push))
                    }
                    ReassemblyOutcome::Incomplete { received, total } => {
                        HandleOutcome::Buffered { received, total }
                    }
                    ReassemblyOutcome::Stale => HandleOutcome::Stale,
                    ReassemblyOutcome::Discarded(reason) => HandleOutcome::Discarded(reason),
                }
            }
        }
    }

    /// Periodic housekeeping: cache sweep, request retries, reassembly expiry.
    pub fn maintain(&mut self) -> MaintenanceReport {
        let expired = self.reassembler.expire_stale(self.clock.now());
        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired partial pushes");
        }
        self.provider.maintain()
    }

    /// Session teardown: drop all cache, allocation and reassembly state.
    pub fn end_session(&mut self) {
        self.reassembler.reset();
        self.provider.clear();
        info!("Sync session ended");
    }

    /// Partial pushes currently buffered.
    pub fn pending_reassemblies(&self) -> usize {
        self.reassembler.pending()
    }
}
