//! Core types for the blueprint template cache.
//!
//! Everything here is plain data shared by the cache, the sync protocol and
//! the transport runner: identifiers, template payloads, digests and clocks.

mod clock;
mod hash;
mod identifiers;
mod network;
mod template;

pub use clock::{Clock, SystemClock};
pub use hash::PayloadHash;
pub use identifiers::{IdParseError, TemplateId};
pub use network::{NetworkMessage, Request};
pub use template::{Template, TemplateKind};
