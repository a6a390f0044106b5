//! Stochastic binarization with a seeded RNG.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::algorithm::{Algorithm, AlgorithmBase};
use crate::config::OptionMap;
use crate::error::Result;
use crate::params::ParamStore;
use crate::quantization::binarize_weights_stochastic;
use crate::strategy::{BinarizationStrategy, BinarizeReport};

/// Stochastic rounding to {-1, +1}.
///
/// Each weight becomes +1 with probability `(w / max|W| + 1) / 2`, so the
/// expected binarized value is proportional to `w`. The RNG is seeded from the
/// config's `seed`; two strategies built with the same options produce the
/// same result, and repeated passes draw fresh samples.
#[derive(Debug, Clone)]
pub struct StochasticBinarizer {
    base: AlgorithmBase,
    rng: ChaCha8Rng,
}

impl StochasticBinarizer {
    /// Registry name.
    pub const NAME: &'static str = "stochastic";

    /// Construct from an option map.
    ///
    /// # Errors
    ///
    /// Returns error if the options are invalid.
    pub fn new(options: OptionMap) -> Result<Self> {
        let base = AlgorithmBase::new(options)?;
        let rng = ChaCha8Rng::seed_from_u64(base.config().seed);
        Ok(Self { base, rng })
    }

    /// Attach the parameters to compress.
    #[must_use]
    pub fn with_params(mut self, params: ParamStore) -> Self {
        self.base = self.base.with_params(params);
        self
    }
}

impl Algorithm for StochasticBinarizer {
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

impl BinarizationStrategy for StochasticBinarizer {
    fn binarize(&mut self) -> Result<BinarizeReport> {
        let scaling = self.base.config().scaling;
        let rng = &mut self.rng;
        super::binarize_params(&mut self.base, Self::NAME, |_, tensor| {
            binarize_weights_stochastic(tensor, scaling, &mut *rng)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{Device, Tensor};
    use serde_json::json;

    fn params(device: &Device) -> ParamStore {
        ParamStore::new().with(
            "fc.weight",
            Tensor::randn(0.0f32, 1.0, (16, 64), device).unwrap(),
        )
    }

    fn options(seed: u64) -> OptionMap {
        let mut options = OptionMap::new();
        options.insert("seed".to_string(), json!(seed));
        options
    }

    #[test]
    fn test_same_seed_same_result() {
        let device = Device::Cpu;
        let params = params(&device);

        let mut a = StochasticBinarizer::new(options(5))
            .unwrap()
            .with_params(params.clone());
        let mut b = StochasticBinarizer::new(options(5))
            .unwrap()
            .with_params(params);

        a.binarize().unwrap();
        b.binarize().unwrap();

        assert_eq!(
            a.base().binarized()["fc.weight"].rows,
            b.base().binarized()["fc.weight"].rows
        );
    }

    #[test]
    fn test_different_seed_differs() {
        let device = Device::Cpu;
        let params = params(&device);

        let mut a = StochasticBinarizer::new(options(1))
            .unwrap()
            .with_params(params.clone());
        let mut b = StochasticBinarizer::new(options(2))
            .unwrap()
            .with_params(params);

        a.binarize().unwrap();
        b.binarize().unwrap();

        // 1024 independent draws; identical output is practically impossible
        assert_ne!(
            a.base().binarized()["fc.weight"].rows,
            b.base().binarized()["fc.weight"].rows
        );
    }

    #[test]
    fn test_repeated_passes_draw_fresh_samples() {
        let device = Device::Cpu;
        let params = params(&device);
        let mut strategy = StochasticBinarizer::new(options(9))
            .unwrap()
            .with_params(params.clone());

        strategy.binarize().unwrap();
        let first = strategy.base().binarized()["fc.weight"].rows.clone();

        // Restore the float weights so the second pass sees the same input
        strategy
            .base_mut()
            .params_mut()
            .replace("fc.weight", params.require("fc.weight").unwrap().clone())
            .unwrap();
        strategy.binarize().unwrap();
        let second = strategy.base().binarized()["fc.weight"].rows.clone();

        assert_ne!(first, second);
    }

    #[test]
    fn test_result_depends_on_pass_count() {
        let device = Device::Cpu;
        let params = params(&device);

        let mut fresh = StochasticBinarizer::new(options(9))
            .unwrap()
            .with_params(params.clone());
        let mut warmed = StochasticBinarizer::new(options(9))
            .unwrap()
            .with_params(params.clone());

        // One extra pass advances the RNG of `warmed`
        warmed.binarize().unwrap();
        warmed
            .base_mut()
            .params_mut()
            .replace("fc.weight", params.require("fc.weight").unwrap().clone())
            .unwrap();

        fresh.binarize().unwrap();
        warmed.binarize().unwrap();

        assert_ne!(
            fresh.base().binarized()["fc.weight"].rows,
            warmed.base().binarized()["fc.weight"].rows
        );
    }
}
