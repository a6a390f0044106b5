//! Concrete binarization strategies.
//!
//! - [`SignBinarizer`]: `sign(W)` with mean |W| scaling (XNOR-Net, BinaryConnect)
//! - [`ThresholdBinarizer`]: split at a fixed or per-channel mean threshold
//! - [`StochasticBinarizer`]: stochastic rounding with a seeded RNG

mod sign;
mod stochastic;
mod threshold;

pub use sign::SignBinarizer;
pub use stochastic::StochasticBinarizer;
pub use threshold::ThresholdBinarizer;

use candle_core::Tensor;

use crate::algorithm::AlgorithmBase;
use crate::error::Result;
use crate::quantization::BinaryWeight;
use crate::strategy::BinarizeReport;

/// Run one binarization pass over every parameter held by `base`.
///
/// Parameters matched by the config's skip rules, scalars, empty tensors and
/// non-float tensors are left untouched. Everything else is packed with
/// `binarize_one`. Only once every target has been packed are the results
/// recorded in the base and the parameters replaced by their dequantized
/// form, so a failing parameter leaves the base unchanged.
pub(crate) fn binarize_params<F>(
    base: &mut AlgorithmBase,
    scheme: &str,
    mut binarize_one: F,
) -> Result<BinarizeReport>
where
    F: FnMut(&str, &Tensor) -> Result<BinaryWeight>,
{
    let targets: Vec<(String, Tensor)> = base
        .params()
        .iter()
        .map(|(name, tensor)| (name.to_string(), tensor.clone()))
        .collect();

    if targets.is_empty() {
        tracing::warn!(scheme, "no parameters to binarize");
    }

    let mut report = BinarizeReport::default();
    let mut packed = Vec::new();

    for (name, tensor) in targets {
        let numel = tensor.elem_count();
        if tensor.rank() == 0
            || numel == 0
            || !tensor.dtype().is_float()
            || base.config().should_skip(&name, numel)
        {
            tracing::debug!(
                scheme,
                param = %name,
                numel,
                dtype = ?tensor.dtype(),
                "skipping parameter"
            );
            report.skipped.push(name);
            continue;
        }

        let binary = binarize_one(&name, &tensor)?;
        tracing::debug!(
            scheme,
            param = %name,
            shape = ?binary.shape,
            positive_fraction = binary.positive_fraction(),
            "binarized parameter"
        );

        report.num_elements += binary.numel();
        report.packed_bytes += binary.memory_bytes();
        packed.push((name, binary));
    }

    for (name, binary) in packed {
        base.store_binarized(&name, binary)?;
        report.binarized.push(name);
    }

    tracing::info!(
        scheme,
        binarized = report.binarized.len(),
        skipped = report.skipped.len(),
        compression_ratio = report.compression_ratio(),
        "binarization pass complete"
    );

    Ok(report)
}
