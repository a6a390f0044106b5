//! Straight-Through Estimator (STE) for sign binarization.
//!
//! The sign function has zero gradient almost everywhere. The STE replaces it
//! in the backward pass with the gradient of a clipped identity, so gradients
//! pass where `|x| <= clip` and are zeroed elsewhere.

use candle_core::{DType, Tensor};

use crate::config::{BinarizeConfig, ScalingMode};
use crate::error::{BinarizeError, Result};

/// Deterministic sign with `sign(0) = +1`, returned in the input dtype.
///
/// # Errors
///
/// Returns error if tensor operations fail.
pub fn sign(input: &Tensor) -> Result<Tensor> {
    let zeros = input.zeros_like()?;
    let positive = input.ge(&zeros)?.to_dtype(input.dtype())?;
    Ok(positive.affine(2.0, -1.0)?)
}

/// Apply sign binarization with a clipped straight-through gradient.
///
/// Forward value is `sign(x)`. Backward gradient is `1` where `|x| <= clip`
/// and `0` elsewhere.
///
/// # Arguments
///
/// * `input` - Input tensor
/// * `clip` - Gradient window half-width
///
/// # Errors
///
/// Returns error if tensor operations fail.
pub fn sign_ste(input: &Tensor, clip: f32) -> Result<Tensor> {
    let hard = sign(input)?.detach();

    let bound = Tensor::full(clip, input.dims(), input.device())?.to_dtype(input.dtype())?;
    let mask = input.abs()?.le(&bound)?.to_dtype(input.dtype())?;

    // `soft - soft.detach()` is zero in value but carries the masked gradient.
    let soft = input.mul(&mask)?;
    let output = hard.add(&soft.sub(&soft.detach())?)?;

    Ok(output)
}

/// Apply scaled sign binarization: `scale * sign_ste(x)`.
///
/// # Errors
///
/// Returns error if tensor operations fail.
pub fn scaled_sign_ste(input: &Tensor, scale: f32, clip: f32) -> Result<Tensor> {
    Ok(sign_ste(input, clip)?.affine(f64::from(scale), 0.0)?)
}

/// Binarize latent full-precision weights for a training forward pass.
///
/// Applies [`sign_ste`] with the config's `clip` and multiplies by the
/// config's scale (mean |W| per tensor or per output channel). The scale is
/// treated as a constant in the backward pass.
///
/// # Errors
///
/// Returns error for scalar tensors or if tensor operations fail.
pub fn binarize_ste(weight: &Tensor, config: &BinarizeConfig) -> Result<Tensor> {
    let dims = weight.dims().to_vec();
    if dims.is_empty() {
        return Err(BinarizeError::InvalidShape(
            "cannot binarize a scalar tensor".to_string(),
        ));
    }

    let hard = sign_ste(weight, config.clip)?;
    let output = match config.scaling {
        ScalingMode::None => hard,
        ScalingMode::PerTensor => {
            let scale = weight.abs()?.mean_all()?.detach();
            hard.broadcast_mul(&scale)?
        }
        ScalingMode::PerChannel => {
            let rows = if dims.len() == 1 { 1 } else { dims[0] };
            let flat = weight.reshape((rows, weight.elem_count() / rows))?;
            let scale = flat
                .abs()?
                .to_dtype(DType::F32)?
                .mean_keepdim(1)?
                .to_dtype(weight.dtype())?
                .detach();
            hard.reshape((rows, weight.elem_count() / rows))?
                .broadcast_mul(&scale)?
                .reshape(dims)?
        }
    };

    Ok(output)
}
