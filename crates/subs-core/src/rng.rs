//! Random number generator abstraction for determinism.
//!
//! In production, this wraps a real RNG. In tests a mock or
//! sequence-backed implementation is injected so delivery delays are
//! predictable.

use std::fmt;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// RNG handle shared between the components that draw from it.
pub type SharedRng = Arc<Mutex<dyn DeterministicRng + Send>>;

/// Production RNG seeded from the operating system.
pub struct SystemRng(StdRng);

impl SystemRng {
    /// Creates an RNG seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Wraps a new `SystemRng` in a [`SharedRng`] handle.
    #[must_use]
    pub fn shared() -> SharedRng {
        Arc::new(Mutex::new(Self::new()))
    }
}

impl Default for SystemRng {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRng").finish_non_exhaustive()
    }
}

impl DeterministicRng for SystemRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        self.0.random_range(min..=max)
    }
}
