//! Outbound and inbound message types for peer communication.

use blueprint_messages::{IdentifierAllocated, RequestTemplate, TemplateFragment};
use blueprint_types::{Template, TemplateId};
use std::sync::Arc;

/// Outbound network messages.
///
/// These are the messages the local peer sends to its remote peer.
/// The runner handles the actual network I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Ask the remote peer for its copy of a template.
    RequestTemplate(RequestTemplate),

    /// Announce a locally reserved identifier.
    IdentifierAllocated(IdentifierAllocated),

    /// Publish a full template. Fragmented by the runner before it hits the wire.
    PushTemplate {
        template_id: TemplateId,
        template: Arc<Template>,
    },
}

impl OutboundMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::RequestTemplate(_) => "RequestTemplate",
            OutboundMessage::IdentifierAllocated(_) => "IdentifierAllocated",
            OutboundMessage::PushTemplate { .. } => "PushTemplate",
        }
    }

    /// Identifier the message is about.
    pub fn template_id(&self) -> TemplateId {
        match self {
            OutboundMessage::RequestTemplate(request) => request.template_id,
            OutboundMessage::IdentifierAllocated(notice) => notice.template_id,
            OutboundMessage::PushTemplate { template_id, .. } => *template_id,
        }
    }

    /// Check if this is a template fetch request.
    pub fn is_request(&self) -> bool {
        matches!(self, OutboundMessage::RequestTemplate(_))
    }

    /// Check if this is a template push.
    pub fn is_push(&self) -> bool {
        matches!(self, OutboundMessage::PushTemplate { .. })
    }
}

/// Inbound network messages, as decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// The remote peer wants our copy of a template.
    RequestTemplate(RequestTemplate),

    /// The remote peer reserved an identifier.
    IdentifierAllocated(IdentifierAllocated),

    /// One slice of a template pushed by the remote peer.
    TemplateFragment(TemplateFragment),
}

impl InboundMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            InboundMessage::RequestTemplate(_) => "RequestTemplate",
            InboundMessage::IdentifierAllocated(_) => "IdentifierAllocated",
            InboundMessage::TemplateFragment(_) => "TemplateFragment",
        }
    }

    /// Identifier the message is about.
    pub fn template_id(&self) -> TemplateId {
        match self {
            InboundMessage::RequestTemplate(request) => request.template_id,
            InboundMessage::IdentifierAllocated(notice) => notice.template_id,
            InboundMessage::TemplateFragment(fragment) => fragment.template_id,
        }
    }
}
