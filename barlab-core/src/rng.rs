//! Deterministic RNG hierarchy.
//!
//! A master seed generates a sub-seed for each `(stream, index)` pair, e.g.
//! `("permutation", 17)`. Sub-seeds are derived via BLAKE3 hashing, independently
//! of scheduling order, so batch results are identical regardless of worker count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Stream name used for return-permutation shuffles.
pub const PERMUTATION_STREAM: &str = "permutation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Hierarchy rooted at a freshly drawn master seed. Read it back with
    /// [`master_seed`](Self::master_seed) to replay the batch later.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().gen())
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive the sub-seed for one member of a stream.
    pub fn sub_seed(&self, stream: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, stream: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, index))
    }
}
