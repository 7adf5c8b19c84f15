//! Configuration Module
//!
//! Handles loading and validating cache construction parameters.

use std::env;
use std::time::Duration;

use crate::cache::{DEFAULT_SHARDS, MAX_SHARDS};
use crate::error::{CacheError, Result};

// == Cleanup Mode ==
/// How often the background cleanup task purges the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupMode {
    /// Sleep for the delay, purge once, then exit
    Once,
    /// Purge every time the delay elapses until stopped
    #[default]
    Recurring,
}

impl CleanupMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "once" => Some(Self::Once),
            "recurring" => Some(Self::Recurring),
            _ => None,
        }
    }
}

/// Cache construction parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime applied by `add`, `set`, `touch` and `get_upd`; zero means never expire
    pub default_expiration: Duration,
    /// Delay before the background purge; zero disables it
    pub autocleanup_delay: Duration,
    /// Number of shards, a power of two
    pub shard_count: usize,
    /// Whether the background purge fires once or repeatedly
    pub cleanup_mode: CleanupMode,
}

impl CacheConfig {
    /// Creates a config with the given expiration and cleanup delay.
    pub fn new(default_expiration: Duration, autocleanup_delay: Duration) -> Self {
        Self {
            default_expiration,
            autocleanup_delay,
            ..Self::default()
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FLACHE_DEFAULT_EXPIRATION_MS` - Default expiration in ms (default: 0, never)
    /// - `FLACHE_AUTOCLEANUP_MS` - Background purge delay in ms (default: 0, disabled)
    /// - `FLACHE_SHARDS` - Shard count (default: 1024)
    /// - `FLACHE_CLEANUP_MODE` - `once` or `recurring` (default: recurring)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_expiration: env_millis("FLACHE_DEFAULT_EXPIRATION_MS")
                .unwrap_or(defaults.default_expiration),
            autocleanup_delay: env_millis("FLACHE_AUTOCLEANUP_MS")
                .unwrap_or(defaults.autocleanup_delay),
            shard_count: env::var("FLACHE_SHARDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.shard_count),
            cleanup_mode: env::var("FLACHE_CLEANUP_MODE")
                .ok()
                .and_then(|v| CleanupMode::parse(&v))
                .unwrap_or(defaults.cleanup_mode),
        }
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_cleanup_mode(mut self, cleanup_mode: CleanupMode) -> Self {
        self.cleanup_mode = cleanup_mode;
        self
    }

    // == Validate ==
    /// Rejects parameters the cache cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 || !self.shard_count.is_power_of_two() {
            return Err(CacheError::InvalidConfiguration(format!(
                "shard count must be a non-zero power of two, got {}",
                self.shard_count
            )));
        }
        if self.shard_count > MAX_SHARDS {
            return Err(CacheError::InvalidConfiguration(format!(
                "shard count {} exceeds maximum of {}",
                self.shard_count, MAX_SHARDS
            )));
        }
        check_nanos("default expiration", self.default_expiration)?;
        check_nanos("autocleanup delay", self.autocleanup_delay)?;
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiration: Duration::ZERO,
            autocleanup_delay: Duration::ZERO,
            shard_count: DEFAULT_SHARDS,
            cleanup_mode: CleanupMode::Recurring,
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

// Timestamps are u64 nanoseconds, so longer durations cannot be stored.
fn check_nanos(what: &str, duration: Duration) -> Result<()> {
    if u64::try_from(duration.as_nanos()).is_err() {
        return Err(CacheError::InvalidConfiguration(format!(
            "{} of {:?} is too large",
            what, duration
        )));
    }
    Ok(())
}
