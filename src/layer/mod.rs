//! Neural network layers for binarized models.
//!
//! This module provides:
//! - `BinaryLinear`: Drop-in replacement for `nn::Linear` with binary weights
//! - Straight-Through Estimator for training through sign

mod binary_linear;
mod ste;

pub use binary_linear::BinaryLinear;
pub use ste::{binarize_ste, scaled_sign_ste, sign, sign_ste};
