//! Error types for the template cache.

use blueprint_types::TemplateId;
use thiserror::Error;

/// Identifier allocation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Every random candidate collided with an already reserved identifier.
    #[error("No free template identifier after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// A key could not build the placeholder for a cache miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Placeholder construction failed: {reason}")]
pub struct PlaceholderError {
    pub reason: String,
}

impl PlaceholderError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by cache and provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The key needed a fresh identifier and none could be allocated.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The miss path could not produce a placeholder.
    #[error("Failed to fetch template {id}")]
    Placeholder {
        id: TemplateId,
        #[source]
        source: PlaceholderError,
    },
}
