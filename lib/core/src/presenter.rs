//! Presentation rescaling for raw similarity scores
//!
//! Raw cosine scores from hashed embeddings cluster low and are hard to read.
//! A result set is min-max mapped into a fixed display interval; order is
//! preserved, absolute values are not comparable across result sets.

use serde::{Deserialize, Serialize};

/// Spread below which a result set counts as flat
pub const FLAT_EPSILON: f64 = 1e-8;

/// Normalized position used for every score of a flat result set
pub const FLAT_POSITION: f64 = 0.75;

/// Bounded interval scores are mapped into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    pub low: f64,
    pub high: f64,
}

impl ScoreScale {
    /// Default display range, 60% to 99%
    pub const PRESENTATION: ScoreScale = ScoreScale { low: 0.60, high: 0.99 };

    /// Narrow display range, 90% to 99%
    pub const STRICT: ScoreScale = ScoreScale { low: 0.90, high: 0.99 };

    pub fn new(low: f64, high: f64) -> Self {
        if low <= high {
            Self { low, high }
        } else {
            Self { low: high, high: low }
        }
    }

    /// Rescale one result set. `None` entries stay unscored.
    pub fn rescale(&self, raw: &[Option<f64>]) -> Vec<Option<f64>> {
        let present = raw.iter().flatten().copied();
        let (min, max) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });
        let span = max - min;

        raw.iter()
            .map(|score| {
                score.map(|s| {
                    let position = if span <= FLAT_EPSILON {
                        FLAT_POSITION
                    } else {
                        (s - min) / span
                    };
                    self.low + position * (self.high - self.low)
                })
            })
            .collect()
    }
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self::PRESENTATION
    }
}

/// Score as a percentage, unrounded
#[inline]
pub fn to_percent(score: f64) -> f64 {
    score * 100.0
}

/// Rounded percentage for display
#[inline]
pub fn display_percent(score: f64) -> i64 {
    to_percent(score).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_bounds() {
        let scaled = ScoreScale::PRESENTATION.rescale(&[Some(0.2), Some(0.5), Some(0.8)]);
        assert!((scaled[0].unwrap() - 0.60).abs() < 1e-12);
        assert!((scaled[1].unwrap() - 0.795).abs() < 1e-12);
        assert!((scaled[2].unwrap() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_rescale_preserves_order() {
        let raw = [Some(0.31), Some(0.05), Some(0.77), Some(0.31), Some(0.5)];
        let scaled = ScoreScale::STRICT.rescale(&raw);
        for i in 0..raw.len() {
            for j in 0..raw.len() {
                if raw[i].unwrap() > raw[j].unwrap() {
                    assert!(scaled[i].unwrap() >= scaled[j].unwrap());
                }
            }
        }
        assert!(scaled.iter().flatten().all(|s| (0.90..=0.99).contains(s)));
    }

    #[test]
    fn test_rescale_flat_set() {
        let scaled = ScoreScale::PRESENTATION.rescale(&[Some(0.4), Some(0.4)]);
        let expected = 0.60 + 0.75 * (0.99 - 0.60);
        assert!(scaled.iter().all(|s| (s.unwrap() - expected).abs() < 1e-12));

        let single = ScoreScale::PRESENTATION.rescale(&[Some(0.1)]);
        assert!((single[0].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_rescale_passes_unscored_through() {
        let scaled = ScoreScale::PRESENTATION.rescale(&[Some(0.1), None, Some(0.9)]);
        assert!(scaled[1].is_none());
        assert!((scaled[0].unwrap() - 0.60).abs() < 1e-12);
        assert!(ScoreScale::PRESENTATION.rescale(&[None, None]).iter().all(Option::is_none));
        assert!(ScoreScale::PRESENTATION.rescale(&[]).is_empty());
    }

    #[test]
    fn test_percent() {
        assert!((to_percent(0.795) - 79.5).abs() < 1e-9);
        assert_eq!(display_percent(0.796), 80);
        assert_eq!(display_percent(0.994), 99);
    }
}
