//! Production randomness.

use stagehand_core::traits::RandomSource;

/// A `RandomSource` over `fastrand::Rng`.
///
/// Unseeded sources draw from fastrand's per-process entropy. Seeded sources
/// replay the same sequence every time, which is what `--seed` relies on.
#[derive(Debug, Clone)]
pub struct FastRandSource {
    rng: fastrand::Rng,
}

impl FastRandSource {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for FastRandSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for FastRandSource {
    fn next_f64(&mut self) -> f64 {
        self.rng.f64()
    }
}
