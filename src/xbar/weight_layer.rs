//! Layer construction dispatched by layer kind.

use ndarray::ArrayD;

use super::conv::Conv2dOp;
use super::layer::{CrossbarLayer, ForwardMode, QatGradients};
use super::linear::LinearOp;
use crate::config::{validate_layer_config, LayerConfig, LayerShape};
use crate::error::Result;
use crate::quant::{BitScale, BitScaleState};

/// A crossbar layer of either registered kind.
#[derive(Clone, Debug)]
pub enum WeightLayer {
    /// `conv`: partitioned over input channels
    Conv(CrossbarLayer<Conv2dOp>),
    /// `fc`: partitioned over input features
    Fc(CrossbarLayer<LinearOp>),
}

macro_rules! dispatch {
    ($self:expr, $layer:ident => $body:expr) => {
        match $self {
            WeightLayer::Conv($layer) => $body,
            WeightLayer::Fc($layer) => $body,
        }
    };
}

impl WeightLayer {
    /// Build the layer a config describes, with random initial weights.
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Build the layer a config describes, seeding the weight init.
    pub fn with_seed(config: &LayerConfig, seed: u64) -> Result<Self> {
        Self::build(config, Some(seed))
    }

    fn build(config: &LayerConfig, seed: Option<u64>) -> Result<Self> {
        validate_layer_config(config)?;
        let hardware = config.hardware.clone();
        let bits = &config.quantize;
        Ok(match config.layer {
            LayerShape::Conv { in_channels, out_channels, kernel_size, stride, padding } => {
                let op = Conv2dOp::new(in_channels, out_channels, kernel_size, stride, padding);
                WeightLayer::Conv(match seed {
                    Some(seed) => CrossbarLayer::with_seed(op, hardware, bits, seed)?,
                    None => CrossbarLayer::new(op, hardware, bits)?,
                })
            }
            LayerShape::Fc { in_features, out_features } => {
                let op = LinearOp::new(in_features, out_features);
                WeightLayer::Fc(match seed {
                    Some(seed) => CrossbarLayer::with_seed(op, hardware, bits, seed)?,
                    None => CrossbarLayer::new(op, hardware, bits)?,
                })
            }
        })
    }

    /// Registry name: `"conv"` or `"fc"`.
    pub fn name(&self) -> &'static str {
        match self {
            WeightLayer::Conv(_) => "conv",
            WeightLayer::Fc(_) => "fc",
        }
    }

    /// See [`CrossbarLayer::forward`].
    pub fn forward(
        &mut self,
        inputs: &ArrayD<f32>,
        mode: ForwardMode,
        input_bit_scale: Option<BitScale>,
    ) -> Result<ArrayD<f32>> {
        dispatch!(self, l => l.forward(inputs, mode, input_bit_scale))
    }

    /// See [`CrossbarLayer::backward`].
    pub fn backward(&self, grad_output: &ArrayD<f32>) -> Result<QatGradients> {
        dispatch!(self, l => l.backward(grad_output))
    }

    /// Set training mode
    pub fn train(&mut self) {
        dispatch!(self, l => l.train())
    }

    /// Set evaluation mode
    pub fn eval(&mut self) {
        dispatch!(self, l => l.eval())
    }

    /// Check if in training mode
    pub fn is_training(&self) -> bool {
        dispatch!(self, l => l.is_training())
    }

    /// Current `(bit_width, step)` table.
    pub fn bit_scale_state(&self) -> &BitScaleState {
        dispatch!(self, l => l.bit_scale_state())
    }

    /// Mutable handle on the `(bit_width, step)` table.
    pub fn bit_scale_state_mut(&mut self) -> &mut BitScaleState {
        dispatch!(self, l => l.bit_scale_state_mut())
    }

    /// Committed output range for the next layer.
    pub fn output_bit_scale(&self) -> BitScale {
        dispatch!(self, l => l.output_bit_scale())
    }

    /// Partition sizes along the input dimension.
    pub fn partition_sizes(&self) -> &[usize] {
        dispatch!(self, l => l.plan().sizes())
    }

    /// Full concatenated weight.
    pub fn weight(&self) -> Result<ArrayD<f32>> {
        dispatch!(self, l => l.weight())
    }

    /// Replace the full weight.
    pub fn set_weight(&mut self, weight: &ArrayD<f32>) -> Result<()> {
        dispatch!(self, l => l.set_weight(weight))
    }
}
