use serde::{Deserialize, Serialize};
use std::ops::Add;

/// A dense embedding vector
///
/// Components are kept as `f64` so scores match the reference hashing
/// scheme bit for bit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Euclidean norm
    #[inline]
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Dot product over the shared prefix of both vectors.
    ///
    /// This is cosine similarity only when both operands are already unit
    /// length; callers normalize first.
    #[inline]
    pub fn dot(&self, other: &Vector) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Normalize the vector to unit length. A zero vector is left untouched.
    #[inline]
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > f64::EPSILON {
            for x in &mut self.data {
                *x /= norm;
            }
        }
    }

    /// Get normalized copy
    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut v = self.clone();
        v.normalize();
        v
    }
}

/// Elementwise sum; the shorter operand is padded with zeros.
impl Add for &Vector {
    type Output = Vector;

    fn add(self, other: &Vector) -> Vector {
        let dim = self.dim().max(other.dim());
        Vector::new(
            (0..dim)
                .map(|i| {
                    self.data.get(i).copied().unwrap_or(0.0)
                        + other.data.get(i).copied().unwrap_or(0.0)
                })
                .collect(),
        )
    }
}

/// Combine two optional vectors into one unit vector.
///
/// With one side absent the other is normalized on its own; with both
/// absent there is nothing to combine.
pub fn combine_and_normalize(a: Option<&Vector>, b: Option<&Vector>) -> Option<Vector> {
    match (a, b) {
        (None, None) => None,
        (Some(v), None) | (None, Some(v)) => Some(v.normalized()),
        (Some(a), Some(b)) => Some((a + b).normalized()),
    }
}
