//! Core message and transport types shared by the cache, the sync protocol
//! and the production runner.
//!
//! The cache never touches the network directly. It hands
//! [`OutboundMessage`]s to a [`MessageSink`]; the runner owning the sink
//! fragments, encodes and ships them. Messages coming back from the remote
//! peer arrive as [`InboundMessage`]s.

mod message;
mod traits;

pub use message::{InboundMessage, OutboundMessage};
pub use traits::MessageSink;
