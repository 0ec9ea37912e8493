//! Stable hashing utilities.
//!
//! Random streams used by testbenches must be a deterministic consequence of
//! a textual label so that a failing randomized run can be reproduced from its
//! name alone. These helpers provide a stable FNV-1a 64-bit implementation.
//!
//! NOTE: FNV-1a is **not** cryptographically secure.

/// 64-bit FNV-1a offset basis.
pub const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf29ce484222325;
/// 64-bit FNV-1a prime.
pub const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01B3;

/// Mix bytes into an existing FNV-1a 64-bit hash state.
///
/// Use [`FNV1A_OFFSET_BASIS_64`] as the initial state for a fresh hash.
///
/// # Example
/// ```
/// use strobe_foundation::stable_hash::{fnv1a64_mix, FNV1A_OFFSET_BASIS_64};
///
/// let hash = fnv1a64_mix(FNV1A_OFFSET_BASIS_64, b"rf.");
/// let hash = fnv1a64_mix(hash, b"write");
/// assert_eq!(hash, strobe_foundation::fnv1a64(b"rf.write"));
/// ```
#[inline]
pub const fn fnv1a64_mix(mut hash: u64, bytes: &[u8]) -> u64 {
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
        i += 1;
    }
    hash
}

/// Hash an arbitrary byte slice with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    fnv1a64_mix(FNV1A_OFFSET_BASIS_64, bytes)
}

/// Hash a UTF-8 string with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64_str(s: &str) -> u64 {
    fnv1a64(s.as_bytes())
}
