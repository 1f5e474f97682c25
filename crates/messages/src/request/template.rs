//! Template fetch request.

use crate::response::PushTemplateUpdate;
use blueprint_types::{NetworkMessage, Request, TemplateId};
use sbor::prelude::BasicSbor;

/// Request the full current template for an identifier from the remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub struct RequestTemplate {
    /// Identifier of the template being requested
    pub template_id: TemplateId,
}

impl RequestTemplate {
    /// Create a new template fetch request.
    pub fn new(template_id: TemplateId) -> Self {
        Self { template_id }
    }
}

// Network message implementation
impl NetworkMessage for RequestTemplate {
    fn message_type_id() -> &'static str {
        "template.request"
    }
}

/// RequestTemplate is answered, eventually and only if the remote peer holds
/// a materialized copy, by a PushTemplateUpdate.
impl Request for RequestTemplate {
    type Response = PushTemplateUpdate;
}
