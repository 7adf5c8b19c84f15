//! Flache - A fast in-process concurrent cache
//!
//! Key-value storage sharded across independently locked partitions, with
//! optional per-entry TTL expiration and background purging.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, Expiration};
pub use config::{CacheConfig, CleanupMode};
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
