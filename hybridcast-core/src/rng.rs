//! Deterministic RNG hierarchy.
//!
//! A master seed generates sub-seeds for each `(ticker, stream, index)` tuple
//! via BLAKE3. Derivation is hash-based rather than sequential, so the seed
//! for one dropout mask does not depend on which thread computed the previous
//! one. Same master seed + same inputs ⇒ identical model.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Named RNG streams used by the forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    WeightInit,
    Shuffle,
    Dropout,
}

impl Stream {
    fn tag(self) -> &'static [u8] {
        match self {
            Stream::WeightInit => b"weight-init",
            Stream::Shuffle => b"shuffle",
            Stream::Dropout => b"dropout",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
    ticker: String,
}

impl RngHierarchy {
    pub fn new(master_seed: u64, ticker: impl Into<String>) -> Self {
        Self {
            master_seed,
            ticker: ticker.into(),
        }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive the sub-seed for `(stream, index)`, independent of derivation order.
    pub fn sub_seed(&self, stream: Stream, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(self.ticker.as_bytes());
        hasher.update(stream.tag());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, stream: Stream, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, index))
    }
}
