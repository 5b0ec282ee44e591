//! Deterministic Park–Miller generator shared by level generation and seeded piece draws.
//!
//! Every derived operation is built only from [`SeededRandom::next`], so two
//! implementations fed the same seed and the same call order produce the same values.

use thiserror::Error;

/// Modulus of the multiplicative recurrence (2^31 - 1).
const MODULUS: i64 = 2_147_483_647;
/// Park–Miller "minimal standard" multiplier.
const MULTIPLIER: i64 = 16_807;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RandomError {
    #[error("cannot choose from an empty slice")]
    EmptyChoice,
    #[error("cannot sample {requested} items from {available}")]
    SampleTooLarge { requested: usize, available: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRandom {
    seed: i64,
}

impl SeededRandom {
    pub fn new(seed: i64) -> Self {
        Self {
            seed: normalize(seed),
        }
    }

    /// Reinitialize in place; identical to constructing a fresh generator.
    pub fn reset(&mut self, seed: i64) {
        self.seed = normalize(seed);
    }

    /// Current internal state, always in `[1, 2^31 - 2]`.
    pub fn state(&self) -> i64 {
        self.seed
    }

    /// Next float in `[0, 1)`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> f64 {
        self.seed = self.seed * MULTIPLIER % MODULUS;
        (self.seed - 1) as f64 / (MODULUS - 1) as f64
    }

    /// Integer in `[min, max]`, both ends inclusive.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        (self.next() * (max - min + 1) as f64).floor() as i64 + min
    }

    /// Float in `[min, max)`.
    pub fn next_float(&mut self, min: f64, max: f64) -> f64 {
        self.next() * (max - min) + min
    }

    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T, RandomError> {
        if items.is_empty() {
            return Err(RandomError::EmptyChoice);
        }
        let index = (self.next() * items.len() as f64).floor() as usize;
        Ok(&items[index.min(items.len() - 1)])
    }

    /// `n` distinct elements: the first `n` of a fresh shuffle.
    pub fn sample<T: Clone>(&mut self, items: &[T], n: usize) -> Result<Vec<T>, RandomError> {
        if n > items.len() {
            return Err(RandomError::SampleTooLarge {
                requested: n,
                available: items.len(),
            });
        }
        let mut shuffled = self.shuffle(items);
        shuffled.truncate(n);
        Ok(shuffled)
    }

    /// Fisher–Yates over a copy; the input is left untouched.
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out = items.to_vec();
        self.shuffle_in_place(&mut out);
        out
    }

    pub fn shuffle_in_place<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next() * (i + 1) as f64).floor() as usize;
            items.swap(i, j.min(i));
        }
    }

    pub fn boolean(&mut self, probability: f64) -> bool {
        self.next() < probability
    }

    /// `boolean(0.5)`.
    pub fn coin(&mut self) -> bool {
        self.boolean(0.5)
    }
}

fn normalize(seed: i64) -> i64 {
    let s = seed % MODULUS;
    if s <= 0 { s + (MODULUS - 1) } else { s }
}
