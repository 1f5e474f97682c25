//! Transport boundary.

use crate::OutboundMessage;

/// Fire-and-forget outbound channel to the remote peer.
///
/// The cache and allocator call `send` while holding their own locks, so
/// implementations must never block and never call back into the cache.
/// Delivery is best effort: a sink whose peer is gone silently drops the
/// message.
///
/// # Example
///
/// ```ignore
/// impl MessageSink for ChannelSink {
///     fn send(&self, message: OutboundMessage) {
///         if self.tx.send(message).is_err() {
///             debug!("Peer link closed, dropping outbound message");
///         }
///     }
/// }
/// ```
pub trait MessageSink: Send + Sync {
    /// Queue a message for delivery. Never blocks.
    fn send(&self, message: OutboundMessage);
}
