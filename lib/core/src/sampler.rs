//! Seeded sampling for evaluation sets
//!
//! The generator is `frac(sin(seed) * 10000)`. It is weak as a source of
//! randomness and only exists so that the same seed always yields the same
//! evaluation set. Keep it exactly as is.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Offset added to the seed when drawing shuffle keys
pub const SHUFFLE_OFFSET: f64 = 99.0;

/// Shape of an evaluation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalSetConfig {
    /// Nearest neighbours of the base item to include
    pub top_candidates: usize,
    /// Extra neighbours requested so filtering can't starve the top list
    pub margin: usize,
    /// Random distractors to include
    pub random_candidates: usize,
    /// Draws allowed before the random fill gives up
    pub max_attempts: usize,
}

impl Default for EvalSetConfig {
    fn default() -> Self {
        Self {
            top_candidates: 5,
            margin: 1,
            random_candidates: 5,
            max_attempts: 200,
        }
    }
}

/// Deterministic value in `[0, 1)` for `seed`.
#[inline]
pub fn seeded_random(seed: f64) -> f64 {
    let x = seed.sin() * 10000.0;
    x - x.floor()
}

/// Draw up to `count` distinct indices in `0..population` that are not in `used`.
///
/// Draw `n` uses `seeded_random(seed + n + 1)`. Accepted indices are added to
/// `used`. Stops after `max_attempts` draws even when short.
pub fn fill_random(
    seed: i64,
    population: usize,
    count: usize,
    max_attempts: usize,
    used: &mut AHashSet<usize>,
) -> Vec<usize> {
    let mut picked = Vec::with_capacity(count);
    if population == 0 {
        return picked;
    }

    let mut attempt = 0usize;
    while picked.len() < count && attempt < max_attempts {
        let draw = seeded_random(seed as f64 + attempt as f64 + 1.0);
        let idx = ((draw * population as f64).floor() as usize).min(population - 1);
        if used.insert(idx) {
            picked.push(idx);
        }
        attempt += 1;
    }
    picked
}

/// Presentation order for `len` items: positions sorted by
/// `seeded_random(seed + position + 99)`, ties in position order.
pub fn shuffle_order(seed: i64, len: usize) -> Vec<usize> {
    let mut keyed: Vec<(usize, f64)> = (0..len)
        .map(|pos| (pos, seeded_random(seed as f64 + pos as f64 + SHUFFLE_OFFSET)))
        .collect();
    keyed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    keyed.into_iter().map(|(pos, _)| pos).collect()
}
