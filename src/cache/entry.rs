//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Expiration ==
/// Absolute expiration instant of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiration {
    /// The entry stays alive until removed
    Never,
    /// Unix timestamp in nanoseconds after which the entry is dead
    At(u64),
}

impl Expiration {
    // == Constructor ==
    /// Returns the expiration `ttl` from `now`, or `Never` for a zero `ttl`.
    pub fn after(ttl: Duration, now: u64) -> Self {
        if ttl.is_zero() {
            return Self::Never;
        }
        let ttl_nanos = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        Self::At(now.saturating_add(ttl_nanos))
    }

    // == Is Passed ==
    /// Checks if the expiration has been reached at `now`.
    ///
    /// Boundary condition: an entry is expired once `now` is greater than or
    /// equal to its deadline.
    #[inline]
    pub fn is_passed(&self, now: u64) -> bool {
        match self {
            Self::Never => false,
            Self::At(deadline) => now >= *deadline,
        }
    }

    /// Raw timestamp in nanoseconds; `Never` maps to 0.
    pub fn timestamp_nanos(&self) -> u64 {
        match self {
            Self::Never => 0,
            Self::At(deadline) => *deadline,
        }
    }

    // == Remaining ==
    /// Returns the time left before expiration, or None if it never expires.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the deadline has passed
    /// - `Some(remaining)` if the deadline is in the future
    /// - `None` for `Expiration::Never`
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::At(deadline) => Some(Duration::from_nanos(
                deadline.saturating_sub(current_timestamp_nanos()),
            )),
        }
    }
}

// == Cache Entry ==
/// A stored value together with its expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    /// The stored value
    pub value: V,
    /// When the entry stops being visible to reads
    pub expiration: Expiration,
}

impl<V> Entry<V> {
    pub fn new(value: V, expiration: Expiration) -> Self {
        Self { value, expiration }
    }

    /// Checks if the entry is alive at `now`.
    #[inline]
    pub fn is_alive(&self, now: u64) -> bool {
        !self.expiration.is_passed(now)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in nanoseconds.
///
/// A clock set before the epoch reads as 0.
pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
