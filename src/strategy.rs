//! The binarization extension point.
//!
//! A pipeline constructs a strategy from an [`OptionMap`] and calls
//! [`BinarizationStrategy::binarize`]. The provided implementation does
//! nothing; concrete schemes override it.

use crate::algorithm::{Algorithm, AlgorithmBase};
use crate::config::OptionMap;
use crate::error::Result;
use crate::params::ParamStore;

/// Outcome of a binarization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinarizeReport {
    /// Parameters that were binarized, in order.
    pub binarized: Vec<String>,

    /// Parameters left in full precision, in order.
    pub skipped: Vec<String>,

    /// Number of elements binarized.
    pub num_elements: usize,

    /// Packed bytes used by the binarized parameters.
    pub packed_bytes: usize,
}

impl BinarizeReport {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binarized.is_empty()
    }

    /// Compression ratio of the binarized parameters vs FP32.
    ///
    /// Returns 1.0 when nothing was binarized.
    #[must_use]
    pub fn compression_ratio(&self) -> f32 {
        if self.packed_bytes == 0 {
            return 1.0;
        }
        (self.num_elements * 4) as f32 / self.packed_bytes as f32
    }
}

/// Contract implemented by every binarization algorithm.
///
/// `Send` so that a pipeline may hand strategies to worker threads.
pub trait BinarizationStrategy: Algorithm + Send {
    /// Binarize the parameters held by the algorithm base.
    ///
    /// The default performs no work and reports nothing binarized.
    ///
    /// # Errors
    ///
    /// Concrete strategies return errors for parameters they cannot handle.
    fn binarize(&mut self) -> Result<BinarizeReport> {
        Ok(BinarizeReport::default())
    }
}

/// Strategy that keeps the default, no-op `binarize`.
#[derive(Debug, Clone)]
pub struct BaseBinarizer {
    base: AlgorithmBase,
}

impl BaseBinarizer {
    /// Registry name.
    pub const NAME: &'static str = "base";

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
}

impl Algorithm for BaseBinarizer {
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

impl BinarizationStrategy for BaseBinarizer {}
