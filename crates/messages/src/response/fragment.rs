//! Push fragment.

use blueprint_types::{NetworkMessage, PayloadHash, TemplateId};
use sbor::prelude::BasicSbor;

/// One slice of a [`PushTemplateUpdate`](super::PushTemplateUpdate).
///
/// Fragments of one push share `template_id`, `sequence`, `total` and
/// `payload_hash`; `index` runs from `0` to `total - 1`. Fragments carry
/// their position explicitly, so wire ordering does not matter.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct TemplateFragment {
    /// Identifier the payload belongs to
    pub template_id: TemplateId,

    /// Sender-assigned push number. A higher sequence supersedes a lower one
    /// for the same identifier.
    pub sequence: u64,

    /// Position of this slice within the push
    pub index: u32,

    /// Number of fragments in the push
    pub total: u32,

    /// Blake3 digest of the full, reassembled payload
    pub payload_hash: PayloadHash,

    /// Slice of the payload
    pub data: Vec<u8>,
}

impl TemplateFragment {
    /// Whether this is the only fragment of its push.
    pub fn is_whole(&self) -> bool {
        self.total == 1
    }
}

impl NetworkMessage for TemplateFragment {
    fn message_type_id() -> &'static str {
        "template.fragment"
    }
}
