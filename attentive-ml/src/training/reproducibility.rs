//! Seed management: independent random streams per training component.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Derives a stable, independent seed for every named component of a run.
///
/// Each grid cell, the final fit and the baseline draw from their own
/// generator, so results do not depend on execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedManager {
    pub global_seed: u64,
}

impl SeedManager {
    pub fn new(global_seed: u64) -> Self {
        Self { global_seed }
    }

    /// First eight bytes of `sha256(global_seed || component)`.
    pub fn seed_for(&self, component: &str) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.global_seed.to_le_bytes());
        hasher.update(component.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn stream(&self, component: &str) -> StdRng {
        StdRng::seed_from_u64(self.seed_for(component))
    }

    /// Stream for one `(hidden size, fold)` cell of the capacity search.
    pub fn cell_stream(&self, hidden: usize, fold: usize) -> StdRng {
        self.stream(&format!("cell/{hidden}/{fold}"))
    }
}
