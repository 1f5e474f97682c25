//! Outbound message sink backed by a tokio channel.

use blueprint_core::{MessageSink, OutboundMessage};
use tokio::sync::mpsc;
use tracing::debug;

/// [`MessageSink`] that hands messages to the session task.
///
/// Sending never blocks, so it is safe to call while the cache lock is held.
/// Once the session task has gone away messages are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiver the session task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Whether the session task has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl MessageSink for ChannelSink {
    fn send(&self, message: OutboundMessage) {
        if let Err(e) = self.tx.send(message) {
            debug!(
                msg_type = e.0.type_name(),
                template_id = %e.0.template_id(),
                "Session closed, dropping outbound message"
            );
        }
    }
}
