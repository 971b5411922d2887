//! Random number sources.

use rand::Rng;

/// Source of bounded random integers.
pub trait RandomSource: Send {
    /// Returns a value in `0..upper`. `upper` must be non-zero.
    fn below(&mut self, upper: u32) -> u32;

    /// Returns `true` or `false` with equal weight.
    fn coin_flip(&mut self) -> bool {
        self.below(2) == 1
    }
}

/// Thread-local OS-seeded randomness.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&mut self, upper: u32) -> u32 {
        rand::thread_rng().gen_range(0..upper.max(1))
    }
}

/// Replays a fixed list of values, cycling when exhausted.
///
/// Each value is reduced modulo the requested bound, so a sequence of `[1]` yields
/// `coin_flip() == true` and `below(10000) == 1`.
#[derive(Clone, Debug)]
pub struct SequenceRandom {
    values: Vec<u32>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl RandomSource for SequenceRandom {
    fn below(&mut self, upper: u32) -> u32 {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value % upper.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_cycles_and_reduces_modulo_bound() {
        let mut rng = SequenceRandom::new(vec![7, 12345]);
        assert_eq!(rng.below(10), 7);
        assert_eq!(rng.below(10000), 2345);
        assert_eq!(rng.below(100), 7);
    }

    #[test]
    fn empty_sequence_yields_zero() {
        let mut rng = SequenceRandom::new(Vec::new());
        assert_eq!(rng.below(10), 0);
        assert!(!rng.coin_flip());
    }

    #[test]
    fn thread_random_stays_in_bounds() {
        let mut rng = ThreadRandom;
        for _ in 0..100 {
            assert!(rng.below(3) < 3);
        }
    }
}
