//! Background Purge Task
//!
//! Deferred task that purges expired cache entries after a delay, once or on
//! every interval.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::CleanupMode;

/// Spawns a background task that purges `cache` after `delay`.
///
/// With `CleanupMode::Once` the task purges a single time and exits; with
/// `CleanupMode::Recurring` it keeps purging every `delay`. The task only holds
/// a weak reference and exits on its next wake-up once the cache is dropped.
/// Purges run on the blocking pool so they never stall the async workers.
///
/// # Arguments
/// * `cache` - Weak reference to the cache to purge
/// * `delay` - Time to sleep before each purge
/// * `mode` - Whether to purge once or repeatedly
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort it.
///
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```ignore
/// let cache = Cache::<String>::new(Duration::from_secs(60), Duration::ZERO)?;
/// let handle = spawn_cleanup_task(Arc::downgrade(&cache), Duration::from_secs(1), CleanupMode::Recurring);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(
    cache: Weak<Cache<V>>,
    delay: Duration,
    mode: CleanupMode,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting cache cleanup task ({:?}) with delay of {:?}", mode, delay);

        loop {
            tokio::time::sleep(delay).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, cleanup task exiting");
                return;
            };

            match tokio::task::spawn_blocking(move || cache.purge()).await {
                Ok(removed) => debug!("Cleanup pass finished, {} entries removed", removed),
                Err(err) => warn!("Cleanup pass failed: {}", err),
            }

            if mode == CleanupMode::Once {
                return;
            }
        }
    })
}
