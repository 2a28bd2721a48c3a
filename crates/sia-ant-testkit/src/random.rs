//! Seeded random data generation
//!
//! Using the same seed produces identical sequences, so a failing test can be
//! replayed exactly.
//!
//! # Example
//!
//! ```rust
//! use sia_ant_testkit::random::PseudoGenerator;
//!
//! let mut rng1 = PseudoGenerator::new(42);
//! let mut rng2 = PseudoGenerator::new(42);
//!
//! assert_eq!(rng1.random_block_id(), rng2.random_block_id());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Words used to build mock wallet seeds
const SEED_WORDS: &[&str] = &[
    "abbey", "adept", "aerial", "agenda", "aisle", "alley", "amaze", "annex", "apex", "army",
    "atom", "avoid", "axis", "bailed", "banjo", "beer", "bias", "bomb", "buzz", "cabin",
    "cactus", "cider", "comb", "cube", "dapper", "debut", "dice", "dogs", "duke", "eagle",
];

/// Number of words in a siad primary seed
pub const SEED_WORD_COUNT: usize = 29;

/// Seeded pseudo-random generator for reproducible test data
#[derive(Debug)]
pub struct PseudoGenerator {
    rng: StdRng,
}

impl PseudoGenerator {
    /// Create a new generator with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate random bytes of the specified length
    pub fn random_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.rng.fill(&mut bytes[..]);
        bytes
    }

    /// A 32-byte block id, hex encoded
    pub fn random_block_id(&mut self) -> String {
        hex::encode(self.random_bytes(32))
    }

    /// A space-separated seed phrase shaped like siad's primary seed
    pub fn random_seed_phrase(&mut self) -> String {
        (0..SEED_WORD_COUNT)
            .map(|_| SEED_WORDS[self.rng.random_range(0..SEED_WORDS.len())])
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `len` consecutive `(height, block id)` pairs starting at `start`
    pub fn random_chain(&mut self, start: u64, len: usize) -> Vec<(u64, String)> {
        (0..len as u64)
            .map(|i| (start + i, self.random_block_id()))
            .collect()
    }
}

/// Generate a random seed (for when you don't care about reproducibility)
pub fn random_seed() -> u64 {
    rand::random()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducibility() {
        let mut rng1 = PseudoGenerator::new(12345);
        let mut rng2 = PseudoGenerator::new(12345);

        assert_eq!(rng1.random_seed_phrase(), rng2.random_seed_phrase());
        assert_eq!(rng1.random_chain(10, 5), rng2.random_chain(10, 5));
    }

    #[test]
    fn test_different_seeds_different_output() {
        let mut rng1 = PseudoGenerator::new(1);
        let mut rng2 = PseudoGenerator::new(2);

        assert_ne!(rng1.random_block_id(), rng2.random_block_id());
    }

    #[test]
    fn test_shapes() {
        let mut rng = PseudoGenerator::new(7);

        let id = rng.random_block_id();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(rng.random_seed_phrase().split(' ').count(), SEED_WORD_COUNT);
    }

    #[test]
    fn test_random_chain_heights() {
        let mut rng = PseudoGenerator::new(3);
        let chain = rng.random_chain(100, 4);

        let heights: Vec<_> = chain.iter().map(|(h, _)| *h).collect();
        assert_eq!(heights, vec![100, 101, 102, 103]);
    }
}
