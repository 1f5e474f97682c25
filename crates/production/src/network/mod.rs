//! Peer link plumbing: frame codec, compression, and the outbound sink.

pub mod codec;
pub mod transport;
pub mod wire;

pub use codec::{
    decode_message, encode_message, CodecError, FrameKind, MAX_BODY_SIZE, MAX_FRAGMENT_SIZE,
};
pub use transport::ChannelSink;
pub use wire::WireError;
