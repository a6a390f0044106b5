//! Quantization primitives for binarization.
//!
//! This module provides:
//! - **Packed storage**: one bit per weight with XNOR-popcount dot products
//! - **Weight binarization**: sign, threshold and stochastic rounding to {-1, +1}

mod binary;
mod packed;

pub use binary::{
    binarize_weights, binarize_weights_stochastic, dequantize_binary, BinaryWeight, Threshold,
};
pub use packed::PackedBits;
