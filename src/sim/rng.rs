//! Random number sources for the simulation
//!
//! There are exactly two streams and they never mix:
//! - [`Mulberry32`]: the seeded, state-affecting stream. Spawns, wander jitter
//!   and catchphrase picks draw from it, so a session replays from its seed.
//! - [`CosmeticRng`]: an unseeded stream for wobble phases and wind particles.
//!   Draws here never change the seeded stream's draw count.
//!
//! The mulberry32 mix below is part of the log compatibility contract: changing
//! any constant breaks replay of every recorded session.

use rand::rand_core::{RngCore, SeedableRng, impls};
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Additive step applied to the state before each draw
const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;

/// 2^32, maps a u32 sample into [0, 1)
const U32_RANGE: f64 = 4_294_967_296.0;

/// Seeded single-stream PRNG (mulberry32)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mulberry32 {
    state: u32,
    /// Samples drawn since the last (re)seed
    #[serde(default)]
    draws: u64,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self {
            state: seed,
            draws: 0,
        }
    }

    /// Reset the stream from a recorded seed
    pub fn reseed(&mut self, seed: u32) {
        self.state = seed;
        self.draws = 0;
    }

    /// Number of samples drawn since seeding
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Advance the state and return one mixed 32-bit sample
    fn step(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        self.draws += 1;
        t ^ (t >> 14)
    }

    /// Uniform sample in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.step()) / U32_RANGE
    }

    /// Uniform index in `0..len` (one draw). `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        let i = (self.next_f64() * len as f64).floor() as usize;
        i.min(len.saturating_sub(1))
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst)
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Fresh unpredictable seed for a live session, drawn from the OS-seeded thread RNG
pub fn generate_seed() -> u32 {
    rand::random::<u32>()
}

/// Unseeded stream for visual-only randomness
#[derive(Debug, Clone)]
pub struct CosmeticRng(Pcg32);

impl CosmeticRng {
    /// Seed from the thread RNG
    pub fn from_entropy() -> Self {
        Self(Pcg32::from_rng(&mut rand::rng()))
    }

    /// Fixed seed, for tests that need stable visuals
    pub fn seeded(seed: u64) -> Self {
        Self(Pcg32::seed_from_u64(seed))
    }

    /// Uniform sample in [0, 1)
    pub fn unit(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

impl Default for CosmeticRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Mulberry32::new(42);
        let mut b = Mulberry32::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
        assert_eq!(a.draws(), 1000);
    }

    #[test]
    fn test_known_vector() {
        // First outputs of mulberry32 seeded with 0
        let mut rng = Mulberry32::new(0);
        assert_eq!(rng.next_u32(), 1_144_304_738);
        assert_eq!(rng.next_u32(), 1_416_247);
    }

    #[test]
    fn test_samples_in_unit_interval() {
        let mut rng = Mulberry32::new(7);
        for _ in 0..10_000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_reseed_restarts_stream() {
        let mut rng = Mulberry32::new(99);
        let first: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
        rng.reseed(99);
        assert_eq!(rng.draws(), 0);
        let again: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_from_seed_matches_new() {
        let mut a = Mulberry32::from_seed(1234u32.to_le_bytes());
        let mut b = Mulberry32::new(1234);
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn test_index_bounds() {
        let mut rng = Mulberry32::new(5);
        for _ in 0..1000 {
            assert!(rng.index(4) < 4);
        }
    }

    #[test]
    fn test_cosmetic_stream_is_independent() {
        let mut seeded = Mulberry32::new(3);
        let mut cosmetic = CosmeticRng::seeded(3);
        for _ in 0..50 {
            let _ = cosmetic.unit();
        }
        assert_eq!(seeded.draws(), 0);
        let _ = seeded.next_f64();
        assert_eq!(seeded.draws(), 1);
    }
}
