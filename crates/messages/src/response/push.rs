//! Whole-template push.

use blueprint_types::{NetworkMessage, PayloadHash, Template, TemplateId};
use sbor::prelude::BasicSbor;

/// The full payload of a template, as seen before fragmentation on the
/// sending side and after reassembly on the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct PushTemplateUpdate {
    /// Identifier the payload belongs to
    pub template_id: TemplateId,

    /// Opaque template payload
    pub payload: Vec<u8>,
}

impl PushTemplateUpdate {
    /// Create a push for an explicit payload.
    pub fn new(template_id: TemplateId, payload: Vec<u8>) -> Self {
        Self {
            template_id,
            payload,
        }
    }

    /// Create a push carrying `template`'s payload under `template_id`.
    pub fn from_template(template_id: TemplateId, template: &Template) -> Self {
        Self::new(template_id, template.payload().to_vec())
    }

    /// Digest of the payload.
    pub fn payload_hash(&self) -> PayloadHash {
        PayloadHash::of(&self.payload)
    }

    /// Turn the received payload into a materialized template.
    pub fn into_template(self) -> Template {
        Template::materialized(self.template_id, self.payload)
    }
}

impl NetworkMessage for PushTemplateUpdate {
    fn message_type_id() -> &'static str {
        "template.push"
    }
}
