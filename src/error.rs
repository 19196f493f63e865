//! Error types for the course cache
//!
//! Cache operations are total: misses, expirations and evictions are ordinary
//! outcomes. Errors only surface from misconfiguration and from the catalog
//! backend a caller composes with the caches.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the course cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// A configuration value was rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The catalog backend failed to produce a result
    #[error("Backend fetch failed: {0}")]
    Backend(String),
}

impl CacheError {
    /// Shorthand for an `InvalidConfig` error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        CacheError::InvalidConfig(msg.into())
    }

    /// Shorthand for a `Backend` error.
    pub fn backend(msg: impl Into<String>) -> Self {
        CacheError::Backend(msg.into())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the course cache.
pub type Result<T> = std::result::Result<T, CacheError>;
