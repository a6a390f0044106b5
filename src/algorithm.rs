//! Shared state and capability for compression algorithms.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::{BinarizeConfig, OptionMap};
use crate::error::Result;
use crate::params::ParamStore;
use crate::quantization::BinaryWeight;

/// State shared by every binarization algorithm.
///
/// Holds the option map exactly as it was supplied, the typed configuration
/// parsed from it, the parameters under compression and the packed weights
/// produced so far.
#[derive(Debug, Clone)]
pub struct AlgorithmBase {
    options: OptionMap,
    config: BinarizeConfig,
    params: ParamStore,
    binarized: BTreeMap<String, BinaryWeight>,
}

impl AlgorithmBase {
    /// Create the base state from an option map.
    ///
    /// # Errors
    ///
    /// Returns error if the options do not form a valid [`BinarizeConfig`].
    pub fn new(options: OptionMap) -> Result<Self> {
        let config = BinarizeConfig::from_options(&options)?;
        Ok(Self {
            options,
            config,
            params: ParamStore::new(),
            binarized: BTreeMap::new(),
        })
    }

    /// Create the base state from a typed configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn from_config(config: BinarizeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            options: config.to_options()?,
            config,
            params: ParamStore::new(),
            binarized: BTreeMap::new(),
        })
    }

    /// Attach the parameters to compress.
    #[must_use]
    pub fn with_params(mut self, params: ParamStore) -> Self {
        self.params = params;
        self
    }

    /// Options as supplied at construction.
    #[must_use]
    pub const fn options(&self) -> &OptionMap {
        &self.options
    }

    /// A single option by name.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Typed configuration.
    #[must_use]
    pub const fn config(&self) -> &BinarizeConfig {
        &self.config
    }

    /// Parameters under compression.
    #[must_use]
    pub const fn params(&self) -> &ParamStore {
        &self.params
    }

    /// Mutable access to the parameters.
    pub fn params_mut(&mut self) -> &mut ParamStore {
        &mut self.params
    }

    /// Packed weights produced by binarization, by parameter name.
    #[must_use]
    pub const fn binarized(&self) -> &BTreeMap<String, BinaryWeight> {
        &self.binarized
    }

    /// Record a packed weight and replace the parameter with its dequantized form.
    ///
    /// # Errors
    ///
    /// Returns error if the parameter is missing or the shapes differ.
    pub fn store_binarized(&mut self, name: &str, binary: BinaryWeight) -> Result<()> {
        let current = self.params.require(name)?;
        let (device, dtype) = (current.device().clone(), current.dtype());
        let dense = crate::quantization::dequantize_binary(&binary, &device)?.to_dtype(dtype)?;
        self.params.replace(name, dense)?;
        self.binarized.insert(name.to_string(), binary);
        Ok(())
    }
}

/// A compression algorithm that owns an [`AlgorithmBase`].
pub trait Algorithm {
    /// Short identifier of the algorithm.
    fn name(&self) -> &str;

    /// Shared base state.
    fn base(&self) -> &AlgorithmBase;

    /// Mutable shared base state.
    fn base_mut(&mut self) -> &mut AlgorithmBase;

    /// Options as supplied at construction.
    fn options(&self) -> &OptionMap {
        self.base().options()
    }

    /// Typed configuration.
    fn config(&self) -> &BinarizeConfig {
        self.base().config()
    }

    /// Parameters under compression.
    fn params(&self) -> &ParamStore {
        self.base().params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, Tensor};
    use serde_json::json;

    #[test]
    fn test_options_kept_verbatim() {
        let mut options = OptionMap::new();
        options.insert("bits".to_string(), json!(1));
        options.insert("custom".to_string(), json!({"nested": [1, 2]}));

        let base = AlgorithmBase::new(options.clone()).unwrap();
        assert_eq!(base.options(), &options);
        assert_eq!(base.option("bits"), Some(&json!(1)));
        assert_eq!(base.config().extra.get("custom"), Some(&json!({"nested": [1, 2]})));
    }

    #[test]
    fn test_from_config() {
        let base = AlgorithmBase::from_config(BinarizeConfig::default().with_seed(9)).unwrap();
        assert_eq!(base.option("seed"), Some(&json!(9)));
        assert_eq!(base.config().seed, 9);

        assert!(AlgorithmBase::from_config(BinarizeConfig::default().with_clip(-1.0)).is_err());
    }

    #[test]
    fn test_store_binarized_replaces_param() {
        let device = Device::Cpu;
        let weight = Tensor::from_vec(vec![0.5f32, -1.5], (1, 2), &device).unwrap();
        let params = ParamStore::new().with("fc.weight", weight.clone());
        let mut base = AlgorithmBase::new(OptionMap::new()).unwrap().with_params(params);

        let binary = crate::quantization::binarize_weights(
            &weight,
            crate::config::ScalingMode::PerChannel,
            crate::quantization::Threshold::Zero,
        )
        .unwrap();
        base.store_binarized("fc.weight", binary).unwrap();

        let values: Vec<f32> = base
            .params()
            .require("fc.weight")
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(values, vec![1.0, -1.0]);
        assert!(base.binarized().contains_key("fc.weight"));

        let other = Tensor::zeros((1, 2), DType::F32, &device).unwrap();
        let missing = crate::quantization::binarize_weights(
            &other,
            crate::config::ScalingMode::None,
            crate::quantization::Threshold::Zero,
        )
        .unwrap();
        assert!(base.store_binarized("missing", missing).is_err());
    }
}
