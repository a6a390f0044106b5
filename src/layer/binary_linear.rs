//! BinaryLinear layer - drop-in replacement for nn::Linear with binary weights.

use candle_core::{Device, Tensor};
use candle_nn::Module;

use crate::config::BinarizeConfig;
use crate::error::{BinarizeError, Result};
use crate::quantization::{
    binarize_weights, dequantize_binary, BinaryWeight, PackedBits, Threshold,
};

/// Linear layer with {-scale, +scale} weights.
///
/// # Example
///
/// ```ignore
/// use binarize_rs::{BinaryLinear, BinarizeConfig};
/// use candle_core::{Device, Tensor};
///
/// let device = Device::Cpu;
/// let weight = Tensor::randn(0.0f32, 1.0, (512, 256), &device)?;
/// let layer = BinaryLinear::from_weight(&weight, None, &BinarizeConfig::default())?;
///
/// let input = Tensor::randn(0.0f32, 1.0, (4, 256), &device)?;
/// let output = layer.forward(&input)?;
/// ```
#[derive(Debug)]
pub struct BinaryLinear {
    weight: BinaryWeight,
    bias: Option<Tensor>,
    device: Device,
}

impl BinaryLinear {
    /// Create a layer by binarizing a weight tensor `[out_features, in_features]`.
    ///
    /// A configured `threshold` is used as a fixed boundary, otherwise sign.
    ///
    /// # Errors
    ///
    /// Returns error if the config is invalid or the weight is not 2D.
    pub fn from_weight(
        weight: &Tensor,
        bias: Option<&Tensor>,
        config: &BinarizeConfig,
    ) -> Result<Self> {
        config.validate()?;

        if weight.dims().len() != 2 {
            return Err(BinarizeError::InvalidShape(
                "weight must be 2D [out_features, in_features]".to_string(),
            ));
        }

        let threshold = config.threshold.map_or(Threshold::Zero, Threshold::Fixed);
        let binary = binarize_weights(weight, config.scaling, threshold)?;

        Self::from_binary(binary, bias.cloned(), weight.device().clone())
    }

    /// Create a layer from an already binarized weight.
    ///
    /// # Errors
    ///
    /// Returns error if the weight is not 2D, its rows or scales disagree
    /// with its shape, or the bias length differs from `out_features`.
    pub fn from_binary(weight: BinaryWeight, bias: Option<Tensor>, device: Device) -> Result<Self> {
        if weight.shape.len() != 2 {
            return Err(BinarizeError::InvalidShape(
                "weight must be 2D [out_features, in_features]".to_string(),
            ));
        }
        weight.validate()?;

        if let Some(ref b) = bias {
            if b.dims() != [weight.shape[0]].as_slice() {
                return Err(BinarizeError::ShapeMismatch {
                    expected: vec![weight.shape[0]],
                    actual: b.dims().to_vec(),
                });
            }
        }

        Ok(Self {
            weight,
            bias,
            device,
        })
    }

    /// Input features dimension.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.weight.shape[1]
    }

    /// Output features dimension.
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.weight.shape[0]
    }

    /// Reference to the binarized weight.
    #[must_use]
    pub const fn binary_weight(&self) -> &BinaryWeight {
        &self.weight
    }

    /// Reference to the bias.
    #[must_use]
    pub const fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// Compression ratio of the weight vs FP32.
    #[must_use]
    pub fn compression_ratio(&self) -> f32 {
        self.weight.compression_ratio()
    }

    /// XNOR-Net style forward pass with binarized inputs.
    ///
    /// Each input row is binarized with sign and scaled by its mean |x|; the
    /// product with each weight row is computed by XNOR-popcount.
    ///
    /// # Arguments
    ///
    /// * `input` - Input tensor [batch, in_features]
    ///
    /// # Errors
    ///
    /// Returns error if the input is not 2D with `in_features` columns.
    pub fn forward_xnor(&self, input: &Tensor) -> Result<Tensor> {
        let dims = input.dims();
        if dims.len() != 2 || dims[1] != self.in_features() {
            return Err(BinarizeError::ShapeMismatch {
                expected: vec![dims.first().copied().unwrap_or(0), self.in_features()],
                actual: dims.to_vec(),
            });
        }

        let batch = dims[0];
        let out_features = self.out_features();
        let rows = input.to_dtype(candle_core::DType::F32)?.to_vec2::<f32>()?;

        let mut output = Vec::with_capacity(batch * out_features);
        for row in &rows {
            let input_scale = row.iter().map(|x| x.abs()).sum::<f32>() / row.len() as f32;
            let signs: Vec<bool> = row.iter().map(|&x| x >= 0.0).collect();
            let packed = PackedBits::from_signs(&signs);

            for (o, weight_row) in self.weight.rows.iter().enumerate() {
                let dot = packed.dot(weight_row)?;
                output.push(dot as f32 * input_scale * self.weight.row_scale(o));
            }
        }

        let output = Tensor::from_vec(output, (batch, out_features), &self.device)?;
        let output = if let Some(ref bias) = self.bias {
            output.broadcast_add(bias)?
        } else {
            output
        };

        Ok(output)
    }
}

impl Module for BinaryLinear {
    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let dims = input.dims();

        // Handle 3D input [batch, seq_len, hidden] by flattening
        let (flat_input, original_shape) = if dims.len() == 3 {
            let (batch, seq_len, hidden) = (dims[0], dims[1], dims[2]);
            (
                input.reshape((batch * seq_len, hidden))?,
                Some((batch, seq_len)),
            )
        } else {
            (input.clone(), None)
        };

        let dense_weight = dequantize_binary(&self.weight, &self.device)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?
            .to_dtype(flat_input.dtype())?;
        let output = flat_input.matmul(&dense_weight.t()?)?;

        let output = if let Some((batch, seq_len)) = original_shape {
            output.reshape((batch, seq_len, self.out_features()))?
        } else {
            output
        };

        let output = if let Some(ref bias) = self.bias {
            output.broadcast_add(bias)?
        } else {
            output
        };

        Ok(output)
    }
}
