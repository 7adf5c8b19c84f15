//! Shard Hash Module
//!
//! 64-bit FNV-1 hash used to map keys onto shards. Not suitable for anything
//! security related.

/// FNV-1 64-bit offset basis
pub const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;

/// FNV-1 64-bit prime
pub const FNV_PRIME: u64 = 1_099_511_628_211;

// == FNV-1 ==
/// Hashes `key` with FNV-1 (multiply, then xor) over its UTF-8 bytes.
///
/// The result is bit-for-bit identical to the canonical FNV-1 64 reference.
#[inline]
pub fn fnv1_64(key: &str) -> u64 {
    key.as_bytes().iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        hash.wrapping_mul(FNV_PRIME) ^ u64::from(byte)
    })
}

/// Maps `key` onto one of `mask + 1` shards.
#[inline]
pub fn shard_index(key: &str, mask: u64) -> usize {
    (fnv1_64(key) & mask) as usize
}
