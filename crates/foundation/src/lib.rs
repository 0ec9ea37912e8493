//! Strobe Foundation
//!
//! Shared primitives for the strobe scheduler: owner paths naming the module
//! that declared an action or resource, bit-level data layouts and records
//! carried between callers and resources, stable hashing, and deterministic
//! random streams for reproducible stimulus.

pub mod ids;
pub mod rng;
pub mod stable_hash;
pub mod value;

pub use ids::Path;
pub use rng::RngStream;
pub use stable_hash::{fnv1a64, fnv1a64_mix, fnv1a64_str, FNV1A_OFFSET_BASIS_64, FNV1A_PRIME_64};
pub use value::{Field, Layout, LayoutError, Record, MAX_FIELD_WIDTH};
