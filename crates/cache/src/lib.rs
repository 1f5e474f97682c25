//! Session-scoped template cache.
//!
//! # Components
//!
//! - [`IdentifierAllocator`] - collision-free identifiers, shared with the remote peer
//! - [`TemplateCache`] - identifier → template map with idle eviction and single-flight fetches
//! - [`TemplateKey`] - resolves to an identifier, allocating lazily when needed
//! - [`TemplateProvider`] - the façade the rest of the application talks to
//!
//! # Identifier lifecycle
//!
//! ```text
//! Unknown ──allocate / IdentifierAllocated──► Reserved ──set / push──► Cached
//!    ▲                                                                   │
//!    └──────────────────────── idle eviction / clear ────────────────────┘
//! ```
//!
//! Nothing here blocks on the network. Outbound messages go to a
//! [`MessageSink`](blueprint_core::MessageSink) and are shipped by the runner.

mod allocator;
mod cache;
mod config;
mod error;
mod key;
mod provider;
mod stats;

pub use allocator::IdentifierAllocator;
pub use cache::TemplateCache;
pub use config::CacheConfig;
pub use error::{AllocationError, CacheError, PlaceholderError};
pub use key::{IdentifiedKey, PendingKey, TemplateKey};
pub use provider::{MaintenanceReport, TemplateProvider};
pub use stats::CacheStats;
