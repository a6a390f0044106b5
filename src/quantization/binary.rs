//! Weight binarization to {-scale, +scale}.
//!
//! Tensors are viewed as `[dim0, rest]`: each slice along the first dimension
//! (an output channel) is packed into one [`PackedBits`] row.

use candle_core::{DType, Device, Tensor};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::packed::PackedBits;
use crate::config::ScalingMode;
use crate::error::{BinarizeError, Result};

/// Decision boundary between -1 and +1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Sign binarization: `x >= 0` maps to +1.
    Zero,
    /// A fixed boundary shared by every row.
    Fixed(f32),
    /// Each row is split at its own mean.
    RowMean,
}

/// Binarized weight with scale factors.
#[derive(Clone, Serialize, Deserialize)]
pub struct BinaryWeight {
    /// One packed row per slice along the first dimension.
    pub rows: Vec<PackedBits>,

    /// Scale factors: one per row for per-channel scaling, otherwise one.
    pub scales: Vec<f32>,

    /// Original tensor shape.
    pub shape: Vec<usize>,

    /// Scaling mode used to compute `scales`.
    pub scaling: ScalingMode,
}

impl std::fmt::Debug for BinaryWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryWeight")
            .field("shape", &self.shape)
            .field("scaling", &self.scaling)
            .field("num_scales", &self.scales.len())
            .field("positive_fraction", &self.positive_fraction())
            .finish_non_exhaustive()
    }
}

impl BinaryWeight {
    /// Number of packed rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Elements per row.
    #[must_use]
    pub fn row_len(&self) -> usize {
        self.rows.first().map_or(0, PackedBits::len)
    }

    /// Total element count.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check that rows and scales agree with `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`BinarizeError::ShapeMismatch`] if the row count, a row
    /// length or the number of scales does not match the shape.
    pub fn validate(&self) -> Result<()> {
        let (num_rows, row_len) = match self.shape.as_slice() {
            [] => (0, 0),
            [len] => (1, *len),
            [first, rest @ ..] => (*first, rest.iter().product()),
        };

        if self.rows.len() != num_rows {
            return Err(BinarizeError::ShapeMismatch {
                expected: vec![num_rows],
                actual: vec![self.rows.len()],
            });
        }

        if let Some(row) = self.rows.iter().find(|r| r.len() != row_len) {
            return Err(BinarizeError::ShapeMismatch {
                expected: vec![row_len],
                actual: vec![row.len()],
            });
        }

        if self.scales.len() != 1 && self.scales.len() != num_rows {
            return Err(BinarizeError::ShapeMismatch {
                expected: vec![num_rows],
                actual: vec![self.scales.len()],
            });
        }

        Ok(())
    }

    /// Scale applied to a given row.
    #[must_use]
    pub fn row_scale(&self, row: usize) -> f32 {
        if self.scales.len() == 1 {
            self.scales[0]
        } else {
            self.scales[row]
        }
    }

    /// Fraction of elements binarized to +1.
    #[must_use]
    pub fn positive_fraction(&self) -> f32 {
        let numel = self.numel();
        if numel == 0 {
            return 0.0;
        }
        let ones: usize = self.rows.iter().map(PackedBits::count_ones).sum();
        ones as f32 / numel as f32
    }

    /// Memory size in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        let bit_bytes: usize = self.rows.iter().map(|r| r.num_words() * 8).sum();
        bit_bytes + self.scales.len() * 4
    }

    /// Compression ratio vs FP32.
    #[must_use]
    pub fn compression_ratio(&self) -> f32 {
        let fp32_bytes = self.numel() * 4;
        fp32_bytes as f32 / self.memory_bytes() as f32
    }
}

/// Split a tensor into f32 rows along its first dimension.
fn tensor_rows(tensor: &Tensor) -> Result<(Vec<usize>, Vec<Vec<f32>>)> {
    let shape = tensor.dims().to_vec();
    if shape.is_empty() {
        return Err(BinarizeError::InvalidShape(
            "cannot binarize a scalar tensor".to_string(),
        ));
    }

    let numel = tensor.elem_count();
    if numel == 0 {
        return Err(BinarizeError::InvalidShape(format!(
            "cannot binarize an empty tensor of shape {shape:?}"
        )));
    }

    let num_rows = if shape.len() == 1 { 1 } else { shape[0] };
    let row_len = numel / num_rows;
    let rows = tensor
        .to_dtype(DType::F32)?
        .reshape((num_rows, row_len))?
        .to_vec2::<f32>()?;

    Ok((shape, rows))
}

fn abs_mean(values: &[f32]) -> f32 {
    values.iter().map(|x| x.abs()).sum::<f32>() / values.len() as f32
}

fn compute_scales(rows: &[Vec<f32>], scaling: ScalingMode) -> Vec<f32> {
    match scaling {
        ScalingMode::None => vec![1.0],
        ScalingMode::PerTensor => {
            let total: f32 = rows.iter().flatten().map(|x| x.abs()).sum();
            let count: usize = rows.iter().map(Vec::len).sum();
            vec![total / count as f32]
        }
        ScalingMode::PerChannel => rows.iter().map(|r| abs_mean(r)).collect(),
    }
}

/// Binarize a weight tensor deterministically.
///
/// # Algorithm
///
/// For each row with boundary `t`:
/// 1. `b = +1` if `w >= t`, else `-1`
/// 2. `scale = mean(|W|)` over the row (per-channel) or tensor (per-tensor)
///
/// An all-zero row gets scale 0, so it dequantizes back to zeros.
///
/// # Arguments
///
/// * `weight` - Weight tensor with at least one dimension
/// * `scaling` - Scale granularity
/// * `threshold` - Decision boundary
///
/// # Errors
///
/// Returns error for scalar or empty tensors.
pub fn binarize_weights(
    weight: &Tensor,
    scaling: ScalingMode,
    threshold: Threshold,
) -> Result<BinaryWeight> {
    let (shape, rows) = tensor_rows(weight)?;

    let packed = rows
        .iter()
        .map(|row| {
            let t = match threshold {
                Threshold::Zero => 0.0,
                Threshold::Fixed(t) => t,
                Threshold::RowMean => row.iter().sum::<f32>() / row.len() as f32,
            };
            let signs: Vec<bool> = row.iter().map(|&w| w >= t).collect();
            PackedBits::from_signs(&signs)
        })
        .collect();

    Ok(BinaryWeight {
        rows: packed,
        scales: compute_scales(&rows, scaling),
        shape,
        scaling,
    })
}

/// Binarize a weight tensor with stochastic rounding.
///
/// Each element becomes +1 with probability `clamp((w / m + 1) / 2, 0, 1)`
/// where `m = max(|W|)` of its row, so the expected value is proportional to
/// `w`. Rows that are entirely zero map to +1.
///
/// # Errors
///
/// Returns error for scalar or empty tensors.
pub fn binarize_weights_stochastic<R: Rng>(
    weight: &Tensor,
    scaling: ScalingMode,
    rng: &mut R,
) -> Result<BinaryWeight> {
    let (shape, rows) = tensor_rows(weight)?;

    let packed = rows
        .iter()
        .map(|row| {
            let max_abs = row.iter().map(|x| x.abs()).fold(0.0f32, f32::max);
            let signs: Vec<bool> = row
                .iter()
                .map(|&w| {
                    if max_abs == 0.0 {
                        true
                    } else {
                        let p = ((w / max_abs + 1.0) / 2.0).clamp(0.0, 1.0);
                        rng.random::<f32>() < p
                    }
                })
                .collect();
            PackedBits::from_signs(&signs)
        })
        .collect();

    Ok(BinaryWeight {
        rows: packed,
        scales: compute_scales(&rows, scaling),
        shape,
        scaling,
    })
}

/// Dequantize a binary weight back to a float tensor of its original shape.
///
/// # Errors
///
/// Returns error if the weight is inconsistent or tensor creation fails.
pub fn dequantize_binary(binary: &BinaryWeight, device: &Device) -> Result<Tensor> {
    binary.validate()?;
    let mut output = Vec::with_capacity(binary.numel());

    for (row_idx, row) in binary.rows.iter().enumerate() {
        let scale = binary.row_scale(row_idx);
        for i in 0..row.len() {
            output.push(f32::from(row.value(i)) * scale);
        }
    }

    let tensor = Tensor::from_vec(output, binary.shape.clone(), device)?;
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sign_preserved() {
        let device = Device::Cpu;
        let values: Vec<f32> = vec![1.0, -1.0, 0.5, -0.5, 2.0, -2.0, 0.0, -0.1];
        let weight = Tensor::from_vec(values, (2, 4), &device).unwrap();

        let binary = binarize_weights(&weight, ScalingMode::PerChannel, Threshold::Zero).unwrap();

        assert_eq!(binary.num_rows(), 2);
        assert_eq!(binary.row_len(), 4);
        assert_eq!(binary.rows[0].to_f32(), vec![1.0, -1.0, 1.0, -1.0]);
        // sign(0) = +1
        assert_eq!(binary.rows[1].to_f32(), vec![1.0, -1.0, 1.0, -1.0]);

        // Row 0: mean(|W|) = 0.75, row 1: (2 + 2 + 0 + 0.1) / 4 = 1.025
        assert!((binary.scales[0] - 0.75).abs() < 1e-6);
        assert!((binary.scales[1] - 1.025).abs() < 1e-6);
    }

    #[test]
    fn test_dequantize() {
        let device = Device::Cpu;
        let values: Vec<f32> = vec![3.0, -1.0, 1.0, -3.0];
        let weight = Tensor::from_vec(values, (1, 4), &device).unwrap();

        let binary = binarize_weights(&weight, ScalingMode::PerChannel, Threshold::Zero).unwrap();
        let restored: Vec<f32> = dequantize_binary(&binary, &device)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();

        assert_eq!(restored, vec![2.0, -2.0, 2.0, -2.0]);
    }

    #[test]
    fn test_scaling_modes() {
        let device = Device::Cpu;
        let values: Vec<f32> = vec![1.0, -1.0, 3.0, -3.0];
        let weight = Tensor::from_vec(values, (2, 2), &device).unwrap();

        let none = binarize_weights(&weight, ScalingMode::None, Threshold::Zero).unwrap();
        assert_eq!(none.scales, vec![1.0]);
        assert!((none.row_scale(1) - 1.0).abs() < f32::EPSILON);

        let tensor = binarize_weights(&weight, ScalingMode::PerTensor, Threshold::Zero).unwrap();
        assert_eq!(tensor.scales, vec![2.0]);

        let channel = binarize_weights(&weight, ScalingMode::PerChannel, Threshold::Zero).unwrap();
        assert_eq!(channel.scales, vec![1.0, 3.0]);
    }

    #[test]
    fn test_thresholds() {
        let device = Device::Cpu;
        let values: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let weight = Tensor::from_vec(values, (1, 4), &device).unwrap();

        let fixed = binarize_weights(&weight, ScalingMode::None, Threshold::Fixed(2.5)).unwrap();
        assert_eq!(fixed.rows[0].to_f32(), vec![-1.0, -1.0, 1.0, 1.0]);

        // Row mean is 2.5
        let mean = binarize_weights(&weight, ScalingMode::None, Threshold::RowMean).unwrap();
        assert_eq!(mean.rows[0], fixed.rows[0]);

        let zero = binarize_weights(&weight, ScalingMode::None, Threshold::Zero).unwrap();
        assert_eq!(zero.rows[0].count_ones(), 4);
    }

    #[test]
    fn test_conv_weight_shape() {
        let device = Device::Cpu;
        let weight = Tensor::randn(0.0f32, 1.0, (8, 3, 3, 3), &device).unwrap();

        let binary = binarize_weights(&weight, ScalingMode::PerChannel, Threshold::Zero).unwrap();
        assert_eq!(binary.num_rows(), 8);
        assert_eq!(binary.row_len(), 27);
        assert_eq!(binary.scales.len(), 8);

        let restored = dequantize_binary(&binary, &device).unwrap();
        assert_eq!(restored.dims(), &[8, 3, 3, 3]);
    }

    #[test]
    fn test_zero_row_scale() {
        let device = Device::Cpu;
        let weight = Tensor::zeros((2, 8), DType::F32, &device).unwrap();

        let binary = binarize_weights(&weight, ScalingMode::PerChannel, Threshold::Zero).unwrap();
        assert!(binary.scales.iter().all(|&s| s == 0.0));

        let restored: Vec<f32> = dequantize_binary(&binary, &device)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert!(restored.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_invalid_shapes() {
        let device = Device::Cpu;

        let scalar = Tensor::new(1.0f32, &device).unwrap();
        assert!(matches!(
            binarize_weights(&scalar, ScalingMode::PerChannel, Threshold::Zero),
            Err(BinarizeError::InvalidShape(_))
        ));

        let empty = Tensor::zeros((0, 4), DType::F32, &device).unwrap();
        assert!(binarize_weights(&empty, ScalingMode::PerChannel, Threshold::Zero).is_err());
    }

    #[test]
    fn test_validate_inconsistent_weight() {
        let device = Device::Cpu;
        let weight = Tensor::randn(0.0f32, 1.0, (2, 4), &device).unwrap();
        let binary = binarize_weights(&weight, ScalingMode::PerChannel, Threshold::Zero).unwrap();
        assert!(binary.validate().is_ok());

        let mut no_scales = binary.clone();
        no_scales.scales.clear();
        assert!(matches!(
            no_scales.validate(),
            Err(BinarizeError::ShapeMismatch { .. })
        ));
        assert!(dequantize_binary(&no_scales, &device).is_err());

        let mut short_row = binary.clone();
        short_row.rows[1] = PackedBits::new(3);
        assert!(short_row.validate().is_err());

        let mut extra_row = binary;
        extra_row.rows.push(PackedBits::new(4));
        assert!(extra_row.validate().is_err());
    }

    #[test]
    fn test_compression_ratio() {
        let device = Device::Cpu;
        let weight = Tensor::randn(0.0f32, 1.0, (256, 1024), &device).unwrap();

        let binary = binarize_weights(&weight, ScalingMode::PerChannel, Threshold::Zero).unwrap();
        let ratio = binary.compression_ratio();
        // 1 bit per weight plus one f32 scale per row
        assert!(ratio > 25.0, "expected >25x compression, got {ratio:.2}x");
    }

    #[test]
    fn test_stochastic_reproducible() {
        let device = Device::Cpu;
        let weight = Tensor::randn(0.0f32, 1.0, (16, 64), &device).unwrap();

        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        let a = binarize_weights_stochastic(&weight, ScalingMode::PerChannel, &mut rng_a).unwrap();
        let b = binarize_weights_stochastic(&weight, ScalingMode::PerChannel, &mut rng_b).unwrap();

        assert_eq!(a.rows, b.rows);
        assert_eq!(a.scales, b.scales);
    }

    #[test]
    fn test_stochastic_extremes_are_deterministic() {
        let device = Device::Cpu;
        // Row max is 2.0, so +-2.0 have probability 1 / 0 of mapping to +1
        let values: Vec<f32> = vec![2.0, -2.0, 2.0, -2.0];
        let weight = Tensor::from_vec(values, (1, 4), &device).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let binary = binarize_weights_stochastic(&weight, ScalingMode::None, &mut rng).unwrap();
        assert_eq!(binary.rows[0].to_f32(), vec![1.0, -1.0, 1.0, -1.0]);
    }
}
