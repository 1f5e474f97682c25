//! Template payload transfer.

mod fragment;
mod push;

pub use fragment::TemplateFragment;
pub use push::PushTemplateUpdate;
