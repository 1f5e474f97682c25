//! Network message marker traits.

/// A message that travels over the sync transport.
pub trait NetworkMessage {
    /// Stable identifier for the message type, used for dispatch and logging.
    fn message_type_id() -> &'static str;
}

/// Type-safe pairing of a request with the message that answers it.
pub trait Request: NetworkMessage {
    type Response: NetworkMessage;
}
