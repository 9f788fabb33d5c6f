//! Seeded random stream shared by every stage of a generation attempt.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};

/// Deterministic random source. The same seed and the same sequence of calls
/// always yield the same values, on every platform.
#[derive(Clone, Debug)]
pub struct RandomStream {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomStream {
    pub fn new(seed: u64) -> Self {
        Self { seed, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Non-negative 31-bit integer.
    pub fn next_int(&mut self) -> u32 {
        self.rng.next_u32() >> 1
    }

    /// Uniform integer in `[min, max)`. Bounds given out of order are swapped;
    /// an empty range yields `min`.
    pub fn next_range(&mut self, min: i32, max: i32) -> i32 {
        let (low, high) = if min > max { (max, min) } else { (min, max) };
        if low == high {
            return low;
        }
        let span = (i64::from(high) - i64::from(low)) as u128;
        let offset = (u128::from(self.rng.next_u64()) * span) >> 64;
        (i64::from(low) + offset as i64) as i32
    }

    /// Uniform index in `[0, len)`; `len` must be non-zero.
    pub fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        ((u128::from(self.rng.next_u64()) * len as u128) >> 64) as usize
    }

    /// Uniform float in `[0, 1)` with 53 bits of precision.
    pub fn next_double(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 * (1.0 / (1_u64 << 53) as f64)
    }

    pub fn next_bytes(&mut self, buffer: &mut [u8]) {
        self.rng.fill_bytes(buffer);
    }

    /// Seed for the next whole-attempt retry, drawn from this stream.
    pub fn derive_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }
}
