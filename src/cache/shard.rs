//! Shard Module
//!
//! One independently locked partition of the key space. Every method holds the
//! shard's mutex for the whole call; the guard releases it on every exit path.
//! Shards know nothing about expiration policy, the cache layer interprets the
//! timestamps they return.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::cache::Entry;

// == Shard ==
#[derive(Debug)]
pub struct Shard<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> Shard<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or overwrites `key`.
    pub fn put(&self, key: String, entry: Entry<V>) {
        self.entries.lock().insert(key, entry);
    }

    /// Removes `key`; no-op if absent.
    pub fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Snapshot of every resident key, stale ones included.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Replaces the storage with an empty map.
    pub fn clear(&self) {
        *self.entries.lock() = HashMap::new();
    }

    /// Number of resident entries, stale ones included.
    pub fn size(&self) -> usize {
        self.entries.lock().len()
    }

    /// Runs `f` with exclusive access to the shard's map.
    ///
    /// Used by the cache for read-modify-write operations that must be atomic
    /// with respect to the key.
    pub fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, Entry<V>>) -> R) -> R {
        let mut entries = self.entries.lock();
        f(&mut entries)
    }
}

impl<V: Clone> Shard<V> {
    /// Copy of the entry stored under `key`, ignoring expiration.
    pub fn get(&self, key: &str) -> Option<Entry<V>> {
        self.entries.lock().get(key).cloned()
    }
}

impl<V> Default for Shard<V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Expiration;

    #[test]
    fn test_put_get_delete() {
        let shard = Shard::new();
        shard.put("key1".to_string(), Entry::new(1, Expiration::Never));

        assert_eq!(shard.get("key1"), Some(Entry::new(1, Expiration::Never)));
        assert_eq!(shard.size(), 1);

        shard.delete("key1");
        assert!(shard.get("key1").is_none());
        assert_eq!(shard.size(), 0);

        // Deleting again is a no-op
        shard.delete("key1");
    }

    #[test]
    fn test_put_overwrites() {
        let shard = Shard::new();
        shard.put("key1".to_string(), Entry::new("a", Expiration::Never));
        shard.put("key1".to_string(), Entry::new("b", Expiration::At(42)));

        assert_eq!(shard.get("key1"), Some(Entry::new("b", Expiration::At(42))));
        assert_eq!(shard.size(), 1);
    }

    #[test]
    fn test_get_ignores_expiration() {
        let shard = Shard::new();
        shard.put("stale".to_string(), Entry::new("v", Expiration::At(1)));

        assert!(shard.get("stale").is_some());
        assert_eq!(shard.keys(), vec!["stale".to_string()]);
        assert_eq!(shard.size(), 1);
    }

    #[test]
    fn test_clear() {
        let shard = Shard::new();
        for i in 0..10 {
            shard.put(format!("key{}", i), Entry::new(i, Expiration::Never));
        }
        assert_eq!(shard.size(), 10);

        shard.clear();
        assert_eq!(shard.size(), 0);
        assert!(shard.keys().is_empty());
    }

    #[test]
    fn test_with_entries_is_atomic_update() {
        let shard = Shard::new();
        shard.put("counter".to_string(), Entry::new(0u32, Expiration::Never));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        shard.with_entries(|entries| {
                            if let Some(entry) = entries.get_mut("counter") {
                                entry.value += 1;
                            }
                        });
                    }
                });
            }
        });

        assert_eq!(shard.get("counter").map(|e| e.value), Some(8000));
    }
}
