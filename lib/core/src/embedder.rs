//! Hashed bag-of-words text embeddings
//!
//! Text is lowercased, split into runs of word characters, and every token
//! bumps one slot of a fixed-size vector chosen by a 32-bit string hash.
//! No model, no vocabulary: the same text always maps to the same vector and
//! distinct tokens may share a slot.

use crate::vector::Vector;

/// Number of slots in every text embedding
pub const VECTOR_SIZE: usize = 256;

/// Split text into lowercase word tokens.
///
/// Anything that is not an ASCII letter, digit or underscore separates
/// tokens, so punctuation and non-ASCII letters never reach the hash.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 32-bit string hash with two's-complement wraparound at every step,
/// returned as its absolute value.
///
/// `h = h * 31 + unit` over UTF-16 code units. `i32::MIN` maps to 2^31.
#[inline]
pub fn hash_token(token: &str) -> u32 {
    let h = token.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    h.unsigned_abs()
}

/// Embedder producing L2-normalized hashed term-frequency vectors
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: VECTOR_SIZE }
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed text into a unit vector, or the zero vector when it has no tokens.
    pub fn embed(&self, text: &str) -> Vector {
        let mut vec = Vector::zeros(self.dim);
        let slots = vec.as_mut_slice();
        for token in tokenize(text) {
            let idx = hash_token(&token) as usize % self.dim;
            slots[idx] += 1.0;
        }
        vec.normalize();
        vec
    }
}

/// Embed with the default 256-slot embedder
#[inline]
pub fn embed(text: &str) -> Vector {
    HashEmbedder::default().embed(text)
}
