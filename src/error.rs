//! Error types for the cache
//!
//! Provides unified error handling using thiserror. The data path never fails:
//! misses are reported as `None`/`false`, so only construction returns errors.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction parameters were rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Automatic cleanup was requested outside of a tokio runtime
    #[error("Automatic cleanup requires a running tokio runtime")]
    RuntimeUnavailable,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
