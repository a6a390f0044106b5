//! Bit-packed storage for {-1, +1} vectors.
//!
//! ## Representation
//!
//! ```text
//! Value | bit
//! ------+----
//!   +1  |  1
//!   -1  |  0
//! ```
//!
//! Dot products between two packed vectors reduce to XNOR + popcount.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BinarizeError, Result};

const WORD_BITS: usize = 64;

/// A packed binary vector, one bit per element.
///
/// # Examples
///
/// ```
/// use binarize_rs::quantization::PackedBits;
///
/// let mut bits = PackedBits::new(100);
/// bits.set(0, true);
/// bits.set(99, true);
///
/// assert!(bits.get(0));
/// assert!(!bits.get(1)); // Default is -1
/// assert_eq!(bits.value(1), -1);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedBits {
    words: Vec<u64>,
    len: usize,
}

impl PackedBits {
    /// Create a packed vector of `len` elements, all -1.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Create from a slice of signs (`true` = +1).
    #[must_use]
    pub fn from_signs(signs: &[bool]) -> Self {
        let mut bits = Self::new(signs.len());
        for (i, &s) in signs.iter().enumerate() {
            bits.set(i, s);
        }
        bits
    }

    /// Create from raw words.
    ///
    /// # Errors
    ///
    /// Returns error if the word count does not match `len`.
    pub fn from_words(words: Vec<u64>, len: usize) -> Result<Self> {
        let expected = len.div_ceil(WORD_BITS);
        if words.len() != expected {
            return Err(BinarizeError::ShapeMismatch {
                expected: vec![expected],
                actual: vec![words.len()],
            });
        }
        let mut bits = Self { words, len };
        bits.clear_tail();
        Ok(bits)
    }

    /// Number of logical elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector has no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of u64 words in storage.
    #[must_use]
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Raw storage words.
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Set element `idx` to +1 (`true`) or -1 (`false`).
    ///
    /// # Panics
    ///
    /// Panics if `idx >= len()`.
    pub fn set(&mut self, idx: usize, positive: bool) {
        assert!(idx < self.len, "index out of bounds");
        let mask = 1u64 << (idx % WORD_BITS);
        if positive {
            self.words[idx / WORD_BITS] |= mask;
        } else {
            self.words[idx / WORD_BITS] &= !mask;
        }
    }

    /// Whether element `idx` is +1.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= len()`.
    #[must_use]
    pub fn get(&self, idx: usize) -> bool {
        assert!(idx < self.len, "index out of bounds");
        self.words[idx / WORD_BITS] & (1u64 << (idx % WORD_BITS)) != 0
    }

    /// Element `idx` as -1 or +1.
    #[must_use]
    pub fn value(&self, idx: usize) -> i8 {
        if self.get(idx) {
            1
        } else {
            -1
        }
    }

    /// Number of +1 elements.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Dot product of two {-1, +1} vectors via XNOR-popcount.
    ///
    /// `dot = 2 * agreements - len`
    ///
    /// # Errors
    ///
    /// Returns error if lengths differ.
    pub fn dot(&self, other: &Self) -> Result<i64> {
        if self.len != other.len {
            return Err(BinarizeError::ShapeMismatch {
                expected: vec![self.len],
                actual: vec![other.len],
            });
        }

        let mut disagreements = 0usize;
        for (a, b) in self.words.iter().zip(other.words.iter()) {
            disagreements += (a ^ b).count_ones() as usize;
        }
        // Tail bits are kept clear in both vectors, so they never disagree.
        let agreements = self.len - disagreements;
        Ok(2 * agreements as i64 - self.len as i64)
    }

    /// Expand to a vector of -1.0 / +1.0 values.
    #[must_use]
    pub fn to_f32(&self) -> Vec<f32> {
        (0..self.len).map(|i| f32::from(self.value(i))).collect()
    }

    fn clear_tail(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

impl fmt::Debug for PackedBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedBits")
            .field("len", &self.len)
            .field("ones", &self.count_ones())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut bits = PackedBits::new(130);
        assert_eq!(bits.num_words(), 3);
        bits.set(0, true);
        bits.set(64, true);
        bits.set(129, true);
        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(1));
        assert_eq!(bits.count_ones(), 3);

        bits.set(64, false);
        assert!(!bits.get(64));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn test_dot_matches_dense() {
        let a_signs: Vec<bool> = (0..100).map(|i| i % 3 == 0).collect();
        let b_signs: Vec<bool> = (0..100).map(|i| i % 2 == 0).collect();
        let a = PackedBits::from_signs(&a_signs);
        let b = PackedBits::from_signs(&b_signs);

        let dense: f32 = a
            .to_f32()
            .iter()
            .zip(b.to_f32().iter())
            .map(|(x, y)| x * y)
            .sum();

        assert_eq!(a.dot(&b).unwrap(), dense as i64);
        assert_eq!(a.dot(&a).unwrap(), 100);
    }

    #[test]
    fn test_dot_length_mismatch() {
        let a = PackedBits::new(10);
        let b = PackedBits::new(11);
        assert!(a.dot(&b).is_err());
    }

    #[test]
    fn test_from_words_clears_tail() {
        let bits = PackedBits::from_words(vec![u64::MAX], 4).unwrap();
        assert_eq!(bits.count_ones(), 4);
        assert!(PackedBits::from_words(vec![0, 0], 4).is_err());
    }
}
