//! Identifier reservation notice.

use blueprint_types::{NetworkMessage, TemplateId};
use sbor::prelude::BasicSbor;

/// Tells the remote peer that `template_id` is now reserved by the sender,
/// so it must never hand out the same identifier itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub struct IdentifierAllocated {
    /// The freshly reserved identifier
    pub template_id: TemplateId,
}

impl IdentifierAllocated {
    /// Create a new allocation notice.
    pub fn new(template_id: TemplateId) -> Self {
        Self { template_id }
    }
}

impl NetworkMessage for IdentifierAllocated {
    fn message_type_id() -> &'static str {
        "template.id.allocated"
    }
}
