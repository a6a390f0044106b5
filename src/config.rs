//! Configuration for binarization strategies.
//!
//! A strategy is constructed from an [`OptionMap`], the open-ended set of
//! named options handed over by the surrounding pipeline. The map is kept
//! verbatim by the algorithm base, and the options this crate understands are
//! parsed into a typed, validated [`BinarizeConfig`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BinarizeError, Result};

/// Named options passed to a strategy at construction.
pub type OptionMap = BTreeMap<String, Value>;

/// How scale factors are computed for binarized weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// No scaling: weights become exactly {-1, +1}.
    None,
    /// A single scale shared by the whole tensor.
    PerTensor,
    /// One scale per output channel (first dimension).
    #[default]
    PerChannel,
}

/// Typed configuration for weight binarization.
///
/// Unrecognized options are kept in [`BinarizeConfig::extra`] so that
/// concrete strategies can read their own settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    /// Bit width of the binarized weights. Only 1 is supported.
    pub bits: u8,

    /// Scale factor granularity.
    pub scaling: ScalingMode,

    /// Fixed binarization threshold.
    /// When unset, threshold-based strategies use the per-channel mean.
    pub threshold: Option<f32>,

    /// Straight-Through Estimator clip value.
    /// Gradients pass where `|x| <= clip` and are zeroed elsewhere.
    pub clip: f32,

    /// Parameters whose name contains any of these patterns are skipped.
    pub skip_patterns: Vec<String>,

    /// Parameters with fewer elements than this are skipped.
    pub min_elements: usize,

    /// Seed for stochastic binarization.
    pub seed: u64,

    /// Options not recognized by this crate.
    #[serde(flatten)]
    pub extra: OptionMap,
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            bits: 1,
            scaling: ScalingMode::PerChannel,
            threshold: None,
            clip: 1.0,
            skip_patterns: vec!["bias".to_string(), "norm".to_string()],
            min_elements: 0,
            seed: 42,
            extra: OptionMap::new(),
        }
    }
}

impl BinarizeConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// XNOR-Net style configuration: sign with per-channel mean |W| scaling.
    #[must_use]
    pub fn xnor() -> Self {
        Self::default()
    }

    /// BinaryConnect style configuration: pure {-1, +1} without scaling.
    #[must_use]
    pub fn binary_connect() -> Self {
        Self {
            scaling: ScalingMode::None,
            ..Default::default()
        }
    }

    /// Parse and validate a configuration from an option map.
    ///
    /// # Errors
    ///
    /// Returns error if an option has the wrong type or the resulting
    /// configuration is invalid.
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        let object: serde_json::Map<String, Value> = options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let config: Self = serde_json::from_value(Value::Object(object))
            .map_err(|e| BinarizeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Convert the configuration back into an option map.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_options(&self) -> Result<OptionMap> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(BinarizeError::Serialization(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set the scaling mode.
    #[must_use]
    pub fn with_scaling(mut self, scaling: ScalingMode) -> Self {
        self.scaling = scaling;
        self
    }

    /// Set a fixed binarization threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Set the STE clip value.
    #[must_use]
    pub fn with_clip(mut self, clip: f32) -> Self {
        self.clip = clip;
        self
    }

    /// Replace the skip patterns.
    #[must_use]
    pub fn with_skip_patterns(mut self, patterns: Vec<String>) -> Self {
        self.skip_patterns = patterns;
        self
    }

    /// Set the minimum element count for a parameter to be binarized.
    #[must_use]
    pub fn with_min_elements(mut self, min_elements: usize) -> Self {
        self.min_elements = min_elements;
        self
    }

    /// Set the stochastic seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether a parameter should be left in full precision.
    #[must_use]
    pub fn should_skip(&self, name: &str, numel: usize) -> bool {
        numel < self.min_elements || self.skip_patterns.iter().any(|p| name.contains(p.as_str()))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.bits != 1 {
            return Err(BinarizeError::InvalidConfig(format!(
                "bits must be 1 for binarization, got {}",
                self.bits
            )));
        }

        if !self.clip.is_finite() || self.clip <= 0.0 {
            return Err(BinarizeError::InvalidConfig(
                "clip must be finite and > 0".to_string(),
            ));
        }

        if let Some(t) = self.threshold {
            if !t.is_finite() {
                return Err(BinarizeError::InvalidConfig(
                    "threshold must be finite".to_string(),
                ));
            }
        }

        if self.skip_patterns.iter().any(String::is_empty) {
            return Err(BinarizeError::InvalidConfig(
                "skip patterns must not be empty strings".to_string(),
            ));
        }

        Ok(())
    }
}
