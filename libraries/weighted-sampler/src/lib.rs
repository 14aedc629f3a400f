//! Random selection helpers for building practice sets.
//!
//! This library provides roulette-wheel selection over a slice of weights, weighted sampling
//! without replacement, and in-place shuffling. Every function takes the random number generator
//! as an argument, so callers can use [`seeded_rng`] to get reproducible runs (simulations,
//! tests) or `rand::thread_rng()` in production.
//!
//! # Example
//!
//! ```
//! use weighted_sampler::{seeded_rng, weighted_random_index};
//!
//! let mut rng = seeded_rng(7);
//! let weights = [0.0, 3.0, 0.0];
//!
//! // Only one entry has any weight, so it is always the one drawn.
//! assert_eq!(weighted_random_index(&weights, &mut rng), Some(1));
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a deterministic generator from a seed.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Weights below zero (and NaN) never get picked.
fn effective_weight(weight: f64) -> f64 {
    if weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Pick an index with probability proportional to its weight.
///
/// Draws a single uniform value in `[0, total)` and walks the weights, subtracting each one until
/// the remainder drops to zero or below. This is O(n) per draw, which is fine for the handful of
/// sections or rules it is used on.
///
/// # Arguments
///
/// * `weights` - One weight per candidate. Negative and NaN weights count as zero.
/// * `rng` - The random number generator to draw from
///
/// # Returns
///
/// The chosen index, or `None` if `weights` is empty. When every weight is zero the choice falls
/// back to a uniform pick over the whole range.
pub fn weighted_random_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights.iter().copied().map(effective_weight).sum();
    if total <= 0.0 || !total.is_finite() {
        return Some(rng.gen_range(0..weights.len()));
    }

    let mut remainder = rng.gen::<f64>() * total;
    let mut last_positive = 0;
    for (index, weight) in weights.iter().copied().map(effective_weight).enumerate() {
        if weight <= 0.0 {
            continue;
        }
        last_positive = index;
        remainder -= weight;
        if remainder <= 0.0 {
            return Some(index);
        }
    }

    // Floating point rounding can leave a sliver of remainder after the last entry.
    Some(last_positive)
}

/// Draw up to `count` distinct indices, each draw weighted by the remaining weights.
///
/// Picked entries have their weight zeroed before the next draw. Sampling stops early once every
/// remaining weight is zero, so the result can be shorter than `count`.
///
/// # Returns
///
/// The picked indices in the order they were drawn.
pub fn weighted_sample_without_replacement<R: Rng + ?Sized>(
    weights: &[f64],
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut remaining: Vec<f64> = weights.iter().copied().map(effective_weight).collect();
    let mut picked = Vec::with_capacity(count.min(weights.len()));

    for _ in 0..count {
        if remaining.iter().all(|weight| *weight == 0.0) {
            break;
        }
        let Some(index) = weighted_random_index(&remaining, rng) else {
            break;
        };
        remaining[index] = 0.0;
        picked.push(index);
    }

    picked
}

/// Shuffle a slice in place into a uniformly random permutation (Fisher–Yates).
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// Shuffle an owned vector and hand it back.
pub fn shuffled<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> Vec<T> {
    shuffle(&mut items, rng);
    items
}
