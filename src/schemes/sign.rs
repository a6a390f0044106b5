//! Sign binarization: `W_b = scale * sign(W)`.

use crate::algorithm::{Algorithm, AlgorithmBase};
use crate::config::{BinarizeConfig, OptionMap};
use crate::error::Result;
use crate::params::ParamStore;
use crate::quantization::{binarize_weights, Threshold};
use crate::strategy::{BinarizationStrategy, BinarizeReport};

/// Deterministic sign binarization.
///
/// With per-channel scaling this is the XNOR-Net weight approximation
/// (`alpha = mean(|W|)` per output channel); with `scaling: none` it is
/// BinaryConnect's plain {-1, +1}.
#[derive(Debug, Clone)]
pub struct SignBinarizer {
    base: AlgorithmBase,
}

impl SignBinarizer {
    /// Registry name.
    pub const NAME: &'static str = "sign";

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

    /// Construct from a typed configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn from_config(config: BinarizeConfig) -> Result<Self> {
        Ok(Self {
            base: AlgorithmBase::from_config(config)?,
        })
    }

    /// Attach the parameters to compress.
    #[must_use]
    pub fn with_params(mut self, params: ParamStore) -> Self {
        self.base = self.base.with_params(params);
        self
    }
}

impl Algorithm for SignBinarizer {
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

impl BinarizationStrategy for SignBinarizer {
    fn binarize(&mut self) -> Result<BinarizeReport> {
        let scaling = self.base.config().scaling;
        super::binarize_params(&mut self.base, Self::NAME, |_, tensor| {
            binarize_weights(tensor, scaling, Threshold::Zero)
        })
    }
}
