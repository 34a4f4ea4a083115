//! Injectable randomness
//!
//! Everything that rolls dice (node placement, disasters, proposal numbers,
//! ticker ids) goes through [`RandomSource`] so tests can pin the sequence.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of uniform random values
pub trait RandomSource {
    /// Uniform float in `[lo, hi]`. Returns `lo` for an empty range.
    fn range_f32(&mut self, lo: f32, hi: f32) -> f32;

    /// Uniform integer in `[lo, hi]` (inclusive). Returns `lo` for an empty range.
    fn range_u32(&mut self, lo: u32, hi: u32) -> u32;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    fn fill_random(&mut self, dest: &mut [u8]);
}

impl<R: RngCore> RandomSource for R {
    fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        self.gen_range(lo..=hi)
    }

    fn range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.gen_range(lo..=hi)
    }

    fn index(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }

    fn fill_random(&mut self, dest: &mut [u8]) {
        self.fill_bytes(dest);
    }
}

/// Build the session RNG: seeded when a seed is configured, entropy otherwise
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
