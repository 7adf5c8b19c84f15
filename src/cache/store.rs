//! Cache Store Module
//!
//! Main cache engine: a fixed array of shards selected by FNV-1 hash, lazy TTL
//! expiration on reads, and fan-out aggregates (size, keys, values, purge,
//! clear) that visit every shard without a global lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rayon::prelude::*;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::hash::shard_index;
use crate::cache::stats::StatsCounters;
use crate::cache::{current_timestamp_nanos, CacheStats, Entry, Expiration, Shard};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_cleanup_task;

// == Cache ==
/// Concurrent key-value cache partitioned across independently locked shards.
///
/// Expired entries are invisible to reads but stay resident until `purge`,
/// `del`, `clear` or an overwrite removes them.
#[derive(Debug)]
pub struct Cache<V> {
    /// Fixed shard array, length is a power of two
    shards: Box<[Shard<V>]>,
    /// `shards.len() - 1`
    mask: u64,
    /// Lifetime used by `add`, `set`, `touch` and `get_upd`
    default_expiration: Duration,
    /// False for static caches, which ignore every expiration
    expiring: bool,
    stats: StatsCounters,
    /// Background purge task, if one was scheduled
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache with the default shard count.
    ///
    /// # Arguments
    /// * `default_expiration` - Lifetime of entries added without an explicit TTL; zero means never
    /// * `autocleanup_delay` - Delay before the background purge; zero disables it
    ///
    /// # Errors
    /// `RuntimeUnavailable` if `autocleanup_delay` is non-zero and no tokio
    /// runtime is running, `InvalidConfiguration` for unrepresentable durations.
    pub fn new(default_expiration: Duration, autocleanup_delay: Duration) -> Result<Arc<Self>> {
        Self::from_config(&CacheConfig::new(default_expiration, autocleanup_delay))
    }

    /// Creates a cache in which nothing ever expires.
    ///
    /// TTL arguments are ignored, `touch` is a no-op and `purge` does nothing.
    pub fn new_static() -> Arc<Self> {
        Arc::new(Self::build(&CacheConfig::default(), false))
    }

    /// Creates a cache from a full configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let autocleanup = !config.autocleanup_delay.is_zero();
        if autocleanup && Handle::try_current().is_err() {
            return Err(CacheError::RuntimeUnavailable);
        }

        let cache = Arc::new(Self::build(config, true));

        if autocleanup {
            let handle = spawn_cleanup_task(
                Arc::downgrade(&cache),
                config.autocleanup_delay,
                config.cleanup_mode,
            );
            *cache.cleanup.lock() = Some(handle);
        }

        Ok(cache)
    }

    fn build(config: &CacheConfig, expiring: bool) -> Self {
        let shards = (0..config.shard_count)
            .map(|_| Shard::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        debug!(
            shards = config.shard_count,
            default_expiration = ?config.default_expiration,
            expiring,
            "Cache created"
        );

        Self {
            shards,
            mask: (config.shard_count - 1) as u64,
            default_expiration: config.default_expiration,
            expiring,
            stats: StatsCounters::default(),
            cleanup: Mutex::new(None),
        }
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[shard_index(key, self.mask)]
    }

    fn default_expiration_at(&self, now: u64) -> Expiration {
        Expiration::after(self.default_expiration, now)
    }

    // == Add ==
    /// Stores `value` under `key` with the default expiration.
    pub fn add(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let entry = Entry::new(value, self.default_expiration_at(current_timestamp_nanos()));
        self.shard(&key).put(key, entry);
    }

    /// Stores `value` under `key`, expiring after `ttl`.
    ///
    /// A zero `ttl` means the entry never expires. Static caches ignore `ttl`.
    pub fn add_ext(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let expiration = if self.expiring {
            Expiration::after(ttl, current_timestamp_nanos())
        } else {
            Expiration::Never
        };
        self.shard(&key).put(key, Entry::new(value, expiration));
    }

    // == Check ==
    /// Returns `(exists, alive)` for `key` without touching it.
    pub fn check(&self, key: &str) -> (bool, bool) {
        let now = current_timestamp_nanos();
        self.shard(key)
            .with_entries(|entries| match entries.get(key) {
                Some(entry) => (true, entry.is_alive(now)),
                None => (false, false),
            })
    }

    /// Returns true if `key` holds an alive entry.
    pub fn has(&self, key: &str) -> bool {
        self.has_ext(key).is_some()
    }

    /// Returns the stored expiration of `key` if it is alive.
    pub fn has_ext(&self, key: &str) -> Option<Expiration> {
        let now = current_timestamp_nanos();
        self.shard(key).with_entries(|entries| {
            entries
                .get(key)
                .filter(|entry| entry.is_alive(now))
                .map(|entry| entry.expiration)
        })
    }

    // == Get ==
    /// Retrieves the value of `key` if it is alive.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_ext(key).map(|(value, _)| value)
    }

    /// Retrieves the value and expiration of `key` if it is alive.
    pub fn get_ext(&self, key: &str) -> Option<(V, Expiration)> {
        let now = current_timestamp_nanos();
        let found = self.shard(key).with_entries(|entries| {
            entries
                .get(key)
                .filter(|entry| entry.is_alive(now))
                .map(|entry| (entry.value.clone(), entry.expiration))
        });
        self.stats.record(found)
    }

    /// Retrieves any stored `key` and, in the same critical section, pushes
    /// its expiration out to now + default expiration.
    ///
    /// An expired entry that has not been purged yet is returned and revived.
    /// With a zero default expiration the entry's expiration is left as is.
    pub fn get_upd(&self, key: &str) -> Option<(V, Expiration)> {
        let now = current_timestamp_nanos();
        let refresh = !self.default_expiration.is_zero();
        let found = self.shard(key).with_entries(|entries| {
            let entry = entries.get_mut(key)?;
            if refresh {
                entry.expiration = self.default_expiration_at(now);
            }
            Some((entry.value.clone(), entry.expiration))
        });
        self.stats.record(found)
    }

    /// Batch `get`; each key is looked up under its own shard lock.
    pub fn gets<I, K>(&self, keys: I) -> Vec<Option<V>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter().map(|key| self.get(key.as_ref())).collect()
    }

    // == Delete ==
    /// Removes `key`; no-op if absent.
    pub fn del(&self, key: &str) {
        self.shard(key).delete(key);
    }

    /// Removes every key in `keys`.
    pub fn dels<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.del(key.as_ref());
        }
    }

    // == Set ==
    /// Replaces the value of `key`, keeping its current expiration.
    ///
    /// A stored key keeps its deadline even if that has already passed. An
    /// absent key is stored as if by `add`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        self.shard(&key).with_entries(|entries| {
            let expiration = match entries.get(&key) {
                Some(entry) => entry.expiration,
                None => self.default_expiration_at(current_timestamp_nanos()),
            };
            entries.insert(key, Entry::new(value, expiration));
        });
    }

    // == Touch ==
    /// Resets the expiration of an alive `key` to now + default expiration.
    ///
    /// Does nothing when the default expiration is zero.
    pub fn touch(&self, key: &str) {
        if self.default_expiration.is_zero() {
            return;
        }
        let now = current_timestamp_nanos();
        self.shard(key).with_entries(|entries| {
            if let Some(entry) = entries.get_mut(key).filter(|entry| entry.is_alive(now)) {
                entry.expiration = self.default_expiration_at(now);
            }
        });
    }

    /// Touches every key in `keys`.
    pub fn touchs<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        if self.default_expiration.is_zero() {
            return;
        }
        for key in keys {
            self.touch(key.as_ref());
        }
    }

    // == Aggregates ==
    /// Alive keys across all shards, in no particular order.
    ///
    /// Each shard is filtered against one clock reading taken under its lock.
    pub fn keys(&self) -> Vec<String> {
        self.shards
            .par_iter()
            .flat_map_iter(|shard| {
                shard.with_entries(|entries| {
                    let now = current_timestamp_nanos();
                    entries
                        .iter()
                        .filter(|(_, entry)| entry.is_alive(now))
                        .map(|(key, _)| key.clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect()
    }

    /// Alive values across all shards, in no particular order.
    pub fn values(&self) -> Vec<V> {
        self.shards
            .par_iter()
            .flat_map_iter(|shard| {
                shard.with_entries(|entries| {
                    let now = current_timestamp_nanos();
                    entries
                        .values()
                        .filter(|entry| entry.is_alive(now))
                        .map(|entry| entry.value.clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect()
    }

    // == Purge ==
    /// Removes every expired entry, visiting shards in parallel.
    ///
    /// Returns once all shards have been swept. Returns the number of entries
    /// removed. Does nothing when the default expiration is zero.
    pub fn purge(&self) -> usize {
        if self.default_expiration.is_zero() {
            return 0;
        }

        let removed: usize = self
            .shards
            .par_iter()
            .map(|shard| {
                shard.with_entries(|entries| {
                    let now = current_timestamp_nanos();
                    let before = entries.len();
                    entries.retain(|_, entry| entry.is_alive(now));
                    before - entries.len()
                })
            })
            .sum();

        self.stats.record_purged(removed);
        if removed > 0 {
            info!("Purge: removed {} expired entries", removed);
        } else {
            debug!("Purge: no expired entries found");
        }
        removed
    }

    /// Empties every shard. Returns after all shards are cleared.
    pub fn clear(&self) {
        self.shards.par_iter().for_each(Shard::clear);
    }

    // == Size ==
    /// Number of alive entries, or of all stored entries when the default
    /// expiration is zero.
    ///
    /// Shards are counted in parallel and summed. The total is not an atomic
    /// snapshot: a shard may change after it has been counted.
    pub fn size(&self) -> usize {
        if self.default_expiration.is_zero() {
            return self.resident_len();
        }
        self.shards
            .par_iter()
            .map(|shard| {
                shard.with_entries(|entries| {
                    let now = current_timestamp_nanos();
                    entries.values().filter(|entry| entry.is_alive(now)).count()
                })
            })
            .sum()
    }

    /// Number of physically stored entries, expired ones included.
    pub fn resident_len(&self) -> usize {
        self.shards.par_iter().map(Shard::size).sum()
    }

    /// Every stored key, expired ones included.
    pub fn resident_keys(&self) -> Vec<String> {
        self.shards.par_iter().flat_map_iter(Shard::keys).collect()
    }

    /// Stored entry for `key` regardless of expiration. Not counted in stats.
    pub fn peek(&self, key: &str) -> Option<Entry<V>> {
        self.shard(key).get(key)
    }

    /// Returns true if no alive entry is stored.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.size())
    }

    /// Zeroes the hit, miss and purge counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    // == Accessors ==
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard that owns `key`.
    pub fn shard_index(&self, key: &str) -> usize {
        shard_index(key, self.mask)
    }

    pub fn default_expiration(&self) -> Duration {
        self.default_expiration
    }

    /// True for caches built with `new_static`.
    pub fn is_static(&self) -> bool {
        !self.expiring
    }
}

impl<V> Cache<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Returns true if `key` is alive and holds `value`.
    pub fn has_entry(&self, key: &str, value: &V) -> bool {
        let now = current_timestamp_nanos();
        self.shard(key).with_entries(|entries| {
            entries
                .get(key)
                .is_some_and(|entry| entry.is_alive(now) && entry.value == *value)
        })
    }
}

impl<V> Cache<V> {
    /// Stops the background cleanup task, if any.
    pub fn stop_cleanup(&self) {
        if let Some(handle) = self.cleanup.lock().take() {
            handle.abort();
            warn!("Cleanup task aborted");
        }
    }
}

impl<V> Drop for Cache<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup.get_mut().take() {
            handle.abort();
        }
    }
}
