//! Network messages for the template sync protocol.
//!
//! Three logical messages travel between peers:
//!
//! - [`RequestTemplate`]: ask the remote peer for its current copy of a template
//! - [`IdentifierAllocated`]: announce that the sender reserved an identifier
//! - [`PushTemplateUpdate`]: the full payload of a template, sent on the wire
//!   as one or more [`TemplateFragment`]s

pub mod gossip;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use gossip::IdentifierAllocated;
pub use request::RequestTemplate;
pub use response::{PushTemplateUpdate, TemplateFragment};
