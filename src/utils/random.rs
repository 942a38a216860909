// src/utils/random.rs

use rand::{
    Rng, SeedableRng,
    rngs::StdRng,
    seq::{SliceRandom, index},
};

/// Source of randomness for sampling and shuffling.
///
/// Works on index positions so the trait stays object safe; use
/// [`shuffled`] and [`sample`] to apply the result to real data.
pub trait Randomizer: Send {
    /// A uniformly random permutation of `0..len`.
    fn permutation(&mut self, len: usize) -> Vec<usize>;

    /// `amount` distinct indices drawn uniformly from `0..len`.
    /// Returns every index (shuffled) when `amount >= len`.
    fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize>;
}

/// Randomizer backed by any `rand` generator.
pub struct RngRandomizer<R = StdRng> {
    rng: R,
}

impl RngRandomizer<StdRng> {
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence, for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> Randomizer for RngRandomizer<R> {
    fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);
        order
    }

    fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        if amount >= len {
            return self.permutation(len);
        }
        index::sample(&mut self.rng, len, amount).into_vec()
    }
}

/// Returns `items` reordered by a random permutation.
pub fn shuffled<T>(rng: &mut dyn Randomizer, items: Vec<T>) -> Vec<T> {
    let order = rng.permutation(items.len());
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Draws `amount` items without replacement.
pub fn sample<T: Clone>(rng: &mut dyn Randomizer, items: &[T], amount: usize) -> Vec<T> {
    rng.sample_indices(items.len(), amount)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}
