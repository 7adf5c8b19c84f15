//! Integration Tests for the Cache
//!
//! Exercises the public API end to end: expiration scenarios, static mode,
//! background purging and parallel access.

use std::sync::{Arc, Barrier};
use std::thread::{self, sleep};
use std::time::Duration;

use flache::{Cache, CacheConfig, CacheError, CleanupMode, Expiration};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flache=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn numbered_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| ((100_000 + i) * 1_000_001).to_string())
        .collect()
}

// == Expiration Scenarios ==

#[test]
fn test_lazy_expiration_scenario() {
    init_tracing();
    let cache = Cache::new(Duration::from_millis(100), Duration::ZERO).unwrap();

    cache.add("k", "v".to_string());
    assert!(cache.has("k"));
    assert!(!cache.has("other"));
    assert_eq!(cache.size(), 1);

    sleep(Duration::from_millis(125));

    assert!(!cache.has("k"));
    assert!(!cache.has("other"));
    assert_eq!(cache.size(), 0);
    // Still physically stored until purged
    assert_eq!(cache.resident_len(), 1);

    assert_eq!(cache.purge(), 1);
    assert_eq!(cache.resident_len(), 0);
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_overwrite_revives_expired_key() {
    let cache = Cache::new(Duration::from_millis(20), Duration::ZERO).unwrap();
    cache.add("k", 1);
    sleep(Duration::from_millis(40));
    assert_eq!(cache.get("k"), None);

    cache.add("k", 2);
    assert_eq!(cache.get("k"), Some(2));
    assert_eq!(cache.resident_len(), 1);
}

#[test]
fn test_get_ext_then_set_keeps_deadline() {
    let cache = Cache::new(Duration::from_millis(100), Duration::from_millis(0)).unwrap();

    cache.add_ext("key2", "123".to_string(), Duration::from_millis(20));
    let (value, expiration) = cache.get_ext("key2").unwrap();
    assert_eq!(value, "123");
    assert!(expiration.remaining().unwrap() > Duration::ZERO);

    cache.set("key2", "456".to_string());
    assert_eq!(cache.get_ext("key2"), Some(("456".to_string(), expiration)));

    sleep(Duration::from_millis(40));

    assert!(cache.get_ext("key2").is_none());
}

#[test]
fn test_static_mode_scenario() {
    init_tracing();
    let cache: Arc<Cache<i32>> = Cache::new_static();

    cache.add("k", 42);
    cache.touch("k");

    sleep(Duration::from_millis(20));

    assert!(cache.has("k"));
    assert_eq!(cache.get("k"), Some(42));
    assert_eq!(cache.has_ext("k"), Some(Expiration::Never));
    assert_eq!(cache.check("k"), (true, true));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let config = CacheConfig::new(Duration::from_secs(1), Duration::ZERO).with_shard_count(100);
    let err = Cache::<String>::from_config(&config).unwrap_err();
    assert!(matches!(err, CacheError::InvalidConfiguration(_)));
}

// == Background Cleanup ==

#[tokio::test]
async fn test_autocleanup_purges_in_background() {
    init_tracing();
    let cache = Cache::new(Duration::from_millis(20), Duration::from_millis(60)).unwrap();
    cache.add("k", "v".to_string());

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(cache.resident_len(), 0);
    assert!(cache.stats().purged >= 1);
}

#[tokio::test]
async fn test_autocleanup_recurs() {
    let cache = Cache::new(Duration::from_millis(10), Duration::from_millis(40)).unwrap();

    cache.add("first", 1);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.resident_len(), 0);

    cache.add("second", 2);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.resident_len(), 0);
}

#[tokio::test]
async fn test_autocleanup_once_fires_once() {
    let config = CacheConfig::new(Duration::from_millis(10), Duration::from_millis(40))
        .with_cleanup_mode(CleanupMode::Once);
    let cache = Cache::from_config(&config).unwrap();

    cache.add("first", 1);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.resident_len(), 0);

    cache.add("second", 2);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.resident_len(), 1);
    assert_eq!(cache.size(), 0);
}

#[tokio::test]
async fn test_stop_cleanup() {
    let cache = Cache::new(Duration::from_millis(10), Duration::from_millis(40)).unwrap();
    cache.stop_cleanup();

    cache.add("k", 1);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.resident_len(), 1);
}

// == Concurrency ==

#[test]
fn test_parallel_writers_and_readers() {
    init_tracing();
    let size = 10_000;
    let threads = 5;
    let segment = size / threads;
    let keys = Arc::new(numbered_keys(size));
    let cache: Arc<Cache<usize>> = Cache::new_static();

    let handles: Vec<_> = (0..threads)
        .map(|offset| {
            let cache = Arc::clone(&cache);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                for j in offset * segment..(offset + 1) * segment {
                    cache.add(keys[j].clone(), j);
                    assert_eq!(cache.get(&keys[j]), Some(j));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.size(), size);
    for (j, key) in keys.iter().enumerate() {
        assert_eq!(cache.get(key), Some(j));
    }
}

#[test]
fn test_no_torn_values_under_contention() {
    let writers = 4;
    let readers = 4;
    let rounds = 2_000;
    let cache: Arc<Cache<(usize, usize)>> = Cache::new_static();
    let barrier = Arc::new(Barrier::new(writers + readers));

    let mut handles = Vec::new();
    for writer in 0..writers {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for round in 0..rounds {
                // Both halves always carry the same writer id
                cache.set("shared", (writer, writer * rounds + round));
            }
        }));
    }
    for _ in 0..readers {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..rounds {
                if let Some((writer, stamp)) = cache.get("shared") {
                    assert_eq!(stamp / rounds, writer, "Torn entry observed");
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.size(), 1);
}

#[test]
fn test_aggregates_during_writes() {
    let cache: Arc<Cache<usize>> = Cache::new(Duration::from_secs(60), Duration::ZERO).unwrap();
    let keys = numbered_keys(2_000);

    thread::scope(|scope| {
        for chunk in keys.chunks(500) {
            let cache = &cache;
            scope.spawn(move || {
                for key in chunk {
                    cache.add(key.clone(), key.len());
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..20 {
                let size = cache.size();
                assert!(size <= 2_000);
                let _ = cache.keys();
                cache.purge();
            }
        });
    });

    assert_eq!(cache.size(), 2_000);
    assert_eq!(cache.keys().len(), 2_000);
    assert_eq!(cache.values().len(), 2_000);

    cache.clear();
    assert_eq!(cache.size(), 0);
}
