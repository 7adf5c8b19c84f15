//! Cache Module
//!
//! Provides the sharded in-memory cache with lazy TTL expiration.

mod entry;
mod hash;
mod shard;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_nanos, Entry, Expiration};
pub use hash::{fnv1_64, FNV_OFFSET_BASIS, FNV_PRIME};
pub use shard::Shard;
pub use stats::CacheStats;
pub use store::Cache;

// == Public Constants ==
/// Shard count used when none is configured
pub const DEFAULT_SHARDS: usize = 1024;

/// Largest accepted shard count
pub const MAX_SHARDS: usize = 1 << 16;
