//! Deterministic `DeterministicRng` implementations for tests.

use subs_core::rng::DeterministicRng;

/// Always draws the lower bound, so every bus delay is the minimum.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// Replays a fixed list of draws, wrapping around at the end. Draws outside
/// the requested range are clamped into it.
#[derive(Debug)]
pub struct SequenceRng {
    draws: Vec<u32>,
    cursor: usize,
}

impl SequenceRng {
    /// Creates an RNG replaying `draws`.
    ///
    /// # Panics
    ///
    /// Panics if `draws` is empty.
    #[must_use]
    pub fn new(draws: Vec<u32>) -> Self {
        assert!(!draws.is_empty(), "SequenceRng needs at least one draw");
        Self { draws, cursor: 0 }
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let draw = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        draw.clamp(min, max)
    }
}
