//! Template push transfer and inbound dispatch.
//!
//! # Architecture
//!
//! ```text
//!  sender                                   receiver
//!  ──────                                   ────────
//!  OutboundMessage::PushTemplate            InboundMessage::TemplateFragment
//!        │                                         │
//!        ▼                                         ▼
//!  Fragmenter::split_push              SyncHandler::handle
//!        │  [TemplateFragment; n]                  │
//!        ▼                                         ▼
//!     transport  ───── any order ─────►   Reassembler::accept
//!                                                  │ Complete
//!                                                  ▼
//!                                       TemplateProvider::apply_push
//! ```
//!
//! Requests and allocation notices are not fragmented; the handler routes
//! them straight to the provider.

mod config;
mod fragment;
mod handler;
mod reassembly;

pub use config::SyncConfig;
pub use fragment::{FragmentError, Fragmenter};
pub use handler::{HandleOutcome, SyncHandler};
pub use reassembly::{DiscardReason, ReassemblyOutcome, Reassembler};
