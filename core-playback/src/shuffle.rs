//! Uniform random permutation.

use rand::Rng;

/// Shuffle `items` in place with the Fisher-Yates algorithm.
///
/// Walks from the last index down to 1 and swaps each slot with a partner
/// drawn uniformly from `[0, i]`, so every permutation is equally likely.
pub fn fisher_yates<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
