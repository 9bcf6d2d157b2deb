//! Random source adapters for probabilistic policies.

use crate::application::ports::RandomSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Draws from the thread-local generator. Not reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl ThreadRandom {
    /// Create a new thread-local random source.
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for ThreadRandom {
    fn below(&self, bound: u64) -> u64 {
        rand::rng().random_range(0..bound.max(1))
    }
}

/// Deterministic generator seeded once and shared by all callers.
///
/// Two registries built with the same seed and fed the same call sequence
/// make the same probabilistic decisions, as long as calls are not raced
/// across threads.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a generator from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn below(&self, bound: u64) -> u64 {
        // A poisoned lock only means another caller panicked mid-draw; the
        // generator state is still valid.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_range(0..bound.max(1))
    }
}
