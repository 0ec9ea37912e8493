//! Deterministic random streams for testbench stimulus.
//!
//! Randomized scheduling tests drive thousands of request/ready patterns.
//! Each stream is derived from a textual label so a failing run is
//! reproducible from the test name alone, on every platform.
//!
//! # PRNG Algorithm
//!
//! SplitMix64: small state, portable, and good enough statistically for
//! generating stimulus.

use crate::stable_hash::fnv1a64_str;

/// A deterministic pseudo-random number stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngStream {
    state: u64,
}

impl RngStream {
    /// Create a new stream from a seed.
    #[inline]
    pub const fn new(seed: u64) -> Self {
        // SplitMix64 needs a non-zero state
        let state = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state }
    }

    /// Create a new stream from a label, hashed with FNV-1a.
    #[inline]
    pub fn from_label(label: &str) -> Self {
        Self::new(fnv1a64_str(label))
    }

    /// Generate the next random u64 value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = splitmix64_next(self.state);
        splitmix64_mix(self.state)
    }

    /// Generate a uniform random f64 in [0, 1).
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        u64_to_f64_01(self.next_u64())
    }

    /// Generate a random boolean with given probability of being true.
    #[inline]
    pub fn bool_with_prob(&mut self, probability: f64) -> bool {
        self.uniform() < probability
    }

    /// Generate a random index in `[0, bound)`. Returns 0 when `bound` is 0.
    #[inline]
    pub fn index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % bound as u64) as usize
    }
}

/// SplitMix64 state transition.
#[inline]
const fn splitmix64_next(state: u64) -> u64 {
    state.wrapping_add(0x9E3779B97F4A7C15)
}

/// SplitMix64 output mixing.
#[inline]
const fn splitmix64_mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Upper 53 bits as a uniform f64 in [0, 1).
#[inline]
const fn u64_to_f64_01(x: u64) -> f64 {
    (x >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
