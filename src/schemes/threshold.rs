//! Threshold binarization: `+1` where `w >= t`, `-1` elsewhere.

use crate::algorithm::{Algorithm, AlgorithmBase};
use crate::config::OptionMap;
use crate::error::Result;
use crate::params::ParamStore;
use crate::quantization::{binarize_weights, Threshold};
use crate::strategy::{BinarizationStrategy, BinarizeReport};

/// Binarization around a threshold.
///
/// Uses the configured `threshold` when set, otherwise centres each output
/// channel on its own mean.
#[derive(Debug, Clone)]
pub struct ThresholdBinarizer {
    base: AlgorithmBase,
}

impl ThresholdBinarizer {
    /// Registry name.
    pub const NAME: &'static str = "threshold";

    /// Construct from an option map.
    ///
    /// # Errors
    ///
    /// Returns error if the options are invalid.
    pub fn new(options: OptionMap) -> Result<Self> {
        Ok(Self {
            base: AlgorithmBase::new(options)?,
        })
    }

    /// Attach the parameters to compress.
    #[must_use]
    pub fn with_params(mut self, params: ParamStore) -> Self {
        self.base = self.base.with_params(params);
        self
    }

    /// Threshold rule in effect.
    #[must_use]
    pub fn threshold(&self) -> Threshold {
        self.base
            .config()
            .threshold
            .map_or(Threshold::RowMean, Threshold::Fixed)
    }
}

impl Algorithm for ThresholdBinarizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn base(&self) -> &AlgorithmBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AlgorithmBase {
        &mut self.base
    }
}

impl BinarizationStrategy for ThresholdBinarizer {
    fn binarize(&mut self) -> Result<BinarizeReport> {
        let scaling = self.base.config().scaling;
        let threshold = self.threshold();
        super::binarize_params(&mut self.base, Self::NAME, |_, tensor| {
            binarize_weights(tensor, scaling, threshold)
        })
    }
}
