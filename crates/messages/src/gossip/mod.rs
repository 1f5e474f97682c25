//! Notices sent to the remote peer without expecting a reply.

mod allocation;

pub use allocation::IdentifierAllocated;
