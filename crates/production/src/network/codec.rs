//! Message encoding and decoding for the peer link.
//!
//! # Wire Format
//!
//! Every frame is a one-byte kind tag followed by an SBOR-encoded,
//! LZ4-compressed body:
//!
//! ```text
//! [kind: u8][LZ4 compressed SBOR payload]
//! ```
//!
//! | kind | body |
//! |------|------|
//! | 1 | `RequestTemplate` |
//! | 2 | `IdentifierAllocated` |
//! | 3 | `TemplateFragment` |
//!
//! Whole-template pushes never appear on the wire; they are split into
//! fragments first.

use super::wire;
use blueprint_core::{InboundMessage, OutboundMessage};
use blueprint_messages::{
    IdentifierAllocated, PushTemplateUpdate, RequestTemplate, TemplateFragment,
};
use blueprint_sync::{FragmentError, Fragmenter};
use blueprint_types::NetworkMessage;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Upper bound on a decompressed frame body.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Largest fragment payload whose encoded frame body stays within
/// [`MAX_BODY_SIZE`]. The rest is headroom for the fragment header.
pub const MAX_FRAGMENT_SIZE: usize = MAX_BODY_SIZE - 1024;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Message too short")]
    MessageTooShort,

    #[error("SBOR decode error in {message}: {reason}")]
    SborDecode {
        message: &'static str,
        reason: String,
    },

    #[error("SBOR encode error: {0}")]
    SborEncode(String),

    #[error("Decompression error: {0}")]
    Decompress(#[from] wire::WireError),

    #[error("Unknown frame kind: {0}")]
    UnknownKind(u8),

    #[error(transparent)]
    Fragment(#[from] FragmentError),
}

/// Frame kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    RequestTemplate = 1,
    IdentifierAllocated = 2,
    TemplateFragment = 3,
}

impl FrameKind {
    fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            1 => Ok(FrameKind::RequestTemplate),
            2 => Ok(FrameKind::IdentifierAllocated),
            3 => Ok(FrameKind::TemplateFragment),
            other => Err(CodecError::UnknownKind(other)),
        }
    }

    /// Message type carried by frames of this kind.
    pub fn message_type_id(self) -> &'static str {
        match self {
            FrameKind::RequestTemplate => RequestTemplate::message_type_id(),
            FrameKind::IdentifierAllocated => IdentifierAllocated::message_type_id(),
            FrameKind::TemplateFragment => TemplateFragment::message_type_id(),
        }
    }
}

/// Encode an outbound message into one or more frames.
///
/// Requests and allocation notices produce exactly one frame. Pushes are
/// fragmented with `fragmenter` and produce one frame per fragment.
pub fn encode_message(
    message: &OutboundMessage,
    fragmenter: &Fragmenter,
) -> Result<Vec<Bytes>, CodecError> {
    match message {
        OutboundMessage::RequestTemplate(request) => {
            Ok(vec![encode_frame(FrameKind::RequestTemplate, request)?])
        }
        OutboundMessage::IdentifierAllocated(notice) => {
            Ok(vec![encode_frame(FrameKind::IdentifierAllocated, notice)?])
        }
        OutboundMessage::PushTemplate {
            template_id,
            template,
        } => {
            let push = PushTemplateUpdate::from_template(*template_id, template);
            fragmenter
                .split_push(&push)?
                .iter()
                .map(|fragment| encode_frame(FrameKind::TemplateFragment, fragment))
                .collect()
        }
    }
}

fn encode_frame<T: sbor::BasicEncode + ?Sized>(
    kind: FrameKind,
    body: &T,
) -> Result<Bytes, CodecError> {
    let sbor_bytes =
        sbor::basic_encode(body).map_err(|e| CodecError::SborEncode(format!("{:?}", e)))?;
    let compressed = wire::compress(&sbor_bytes);

    let mut frame = BytesMut::with_capacity(1 + compressed.len());
    frame.put_u8(kind as u8);
    frame.put_slice(&compressed);
    Ok(frame.freeze())
}

/// Decode one frame from the peer link.
///
/// The kind tag determines the message type (tag-based dispatch).
pub fn decode_message(data: &[u8]) -> Result<InboundMessage, CodecError> {
    let (&tag, body) = data.split_first().ok_or(CodecError::MessageTooShort)?;
    let kind = FrameKind::from_tag(tag)?;
    if body.is_empty() {
        return Err(CodecError::MessageTooShort);
    }

    let payload = wire::decompress(body, MAX_BODY_SIZE)?;
    let decode_error = |e: sbor::DecodeError| CodecError::SborDecode {
        message: kind.message_type_id(),
        reason: format!("{:?}", e),
    };

    match kind {
        FrameKind::RequestTemplate => {
            let request: RequestTemplate = sbor::basic_decode(&payload).map_err(decode_error)?;
            Ok(InboundMessage::RequestTemplate(request))
        }
        FrameKind::IdentifierAllocated => {
            let notice: IdentifierAllocated = sbor::basic_decode(&payload).map_err(decode_error)?;
            Ok(InboundMessage::IdentifierAllocated(notice))
        }
        FrameKind::TemplateFragment => {
            let fragment: TemplateFragment = sbor::basic_decode(&payload).map_err(decode_error)?;
            Ok(InboundMessage::TemplateFragment(fragment))
        }
    }
}
