//! Pluggable weight binarization for model compression.
//!
//! This crate defines the extension point binarization algorithms plug into,
//! and ships a few concrete schemes built on it:
//! - **Contract**: [`BinarizationStrategy`] over an [`Algorithm`] base that
//!   keeps the construction options verbatim alongside a validated
//!   [`BinarizeConfig`]
//! - **Schemes**: sign (XNOR-Net / BinaryConnect), threshold and stochastic
//! - **Storage**: 1 bit per weight with per-tensor or per-channel scales
//! - **Training**: sign Straight-Through Estimator with gradient clipping
//! - **Inference**: [`BinaryLinear`], a drop-in for `nn::Linear`
//!
//! # Quick Start
//!
//! ```ignore
//! use binarize_rs::{BinarizationStrategy, OptionMap, ParamStore, StrategyRegistry};
//! use candle_core::{Device, Tensor};
//!
//! let device = Device::Cpu;
//! let params = ParamStore::new()
//!     .with("fc1.weight", Tensor::randn(0.0f32, 1.0, (256, 512), &device)?)
//!     .with("fc1.bias", Tensor::zeros(256, candle_core::DType::F32, &device)?);
//!
//! let registry = StrategyRegistry::with_builtin();
//! let mut strategy = registry.create("sign", OptionMap::new(), params)?;
//! let report = strategy.binarize()?;
//!
//! println!("Compression ratio: {:.2}x", report.compression_ratio());
//! ```
//!
//! # Writing a strategy
//!
//! Hold an [`AlgorithmBase`], implement [`Algorithm`] to expose it, and
//! override [`BinarizationStrategy::binarize`]. Without an override the
//! strategy is a no-op, like [`BaseBinarizer`].
//!
//! # References
//!
//! - "BinaryConnect: Training Deep Neural Networks with binary weights during
//!   propagations" <https://arxiv.org/abs/1511.00363>
//! - "XNOR-Net: ImageNet Classification Using Binary Convolutional Neural
//!   Networks" <https://arxiv.org/abs/1603.05279>

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]

mod algorithm;
mod config;
mod error;
pub mod layer;
mod params;
pub mod quantization;
mod registry;
pub mod schemes;
mod strategy;

pub use algorithm::{Algorithm, AlgorithmBase};
pub use config::{BinarizeConfig, OptionMap, ScalingMode};
pub use error::{BinarizeError, Result};
pub use layer::BinaryLinear;
pub use params::ParamStore;
pub use quantization::{
    binarize_weights, binarize_weights_stochastic, dequantize_binary, BinaryWeight, PackedBits,
    Threshold,
};
pub use registry::{StrategyConstructor, StrategyRegistry};
pub use schemes::{SignBinarizer, StochasticBinarizer, ThresholdBinarizer};
pub use strategy::{BaseBinarizer, BinarizationStrategy, BinarizeReport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::algorithm::{Algorithm, AlgorithmBase};
    pub use crate::config::{BinarizeConfig, OptionMap, ScalingMode};
    pub use crate::error::{BinarizeError, Result};
    pub use crate::params::ParamStore;
    pub use crate::registry::StrategyRegistry;
    pub use crate::strategy::{BinarizationStrategy, BinarizeReport};
}
