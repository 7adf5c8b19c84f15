//! Background Tasks Module
//!
//! Contains background tasks that run alongside the cache.
//!
//! # Tasks
//! - Purge: Removes expired cache entries after the configured delay

mod cleanup;

pub use cleanup::spawn_cleanup_task;
