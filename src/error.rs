//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror. A cache miss is not an
//! error: lookups return `Option` and only exceptional conditions land here.

use std::path::Path;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its stores.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The persistence medium could not be read, decoded or written
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid request data (e.g. a zero TTL)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A background store task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Builds a `StoreUnavailable` error naming the file it happened on.
    pub fn store_io(path: &Path, action: &str, err: impl std::fmt::Display) -> Self {
        CacheError::StoreUnavailable(format!(
            "failed to {} {}: {}",
            action,
            path.display(),
            err
        ))
    }

    /// Returns true if this error means durability was lost.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
