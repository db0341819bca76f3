//! YAML schema definitions for crossbar layer configuration

use serde::{Deserialize, Serialize};

use crate::quant::{RANGE_MOMENTUM, RANGE_SIGMA};

fn default_momentum() -> f32 {
    RANGE_MOMENTUM
}

fn default_sigma() -> f32 {
    RANGE_SIGMA
}

fn default_stride() -> usize {
    1
}

/// Complete layer specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Bit widths for input, weight and output
    pub quantize: QuantizeBits,

    /// Crossbar hardware parameters
    pub hardware: HardwareConfig,

    /// Layer kind and shape
    pub layer: LayerShape,
}

/// Bit widths of the three tracked quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizeBits {
    /// Input activation bits
    pub input: u32,
    /// Weight bits
    pub weight: u32,
    /// Output activation bits
    pub output: u32,

    /// Share of the committed activation range kept per training update
    #[serde(default = "default_momentum")]
    pub momentum: f32,

    /// Standard deviations spanned by the data-driven activation range
    #[serde(default = "default_sigma")]
    pub sigma: f32,
}

impl QuantizeBits {
    /// Bit widths with default range heuristics.
    pub fn new(input: u32, weight: u32, output: u32) -> Self {
        Self { input, weight, output, momentum: RANGE_MOMENTUM, sigma: RANGE_SIGMA }
    }
}

impl Default for QuantizeBits {
    fn default() -> Self {
        Self::new(9, 9, 9)
    }
}

/// Crossbar sub-array and converter parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Physical rows per crossbar sub-array
    pub xbar_row: usize,
    /// Bits stored per cell
    pub cell_bit: u32,
    /// Bits injected per DAC cycle
    pub dac_bit: u32,
    /// ADC readout bits
    pub adc_bit: u32,
    /// Fixed-point shift applied before ADC readout (may be negative)
    #[serde(default)]
    pub point_shift: i32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self { xbar_row: 256, cell_bit: 2, dac_bit: 1, adc_bit: 10, point_shift: -2 }
    }
}

/// Layer kind and mathematical shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerShape {
    /// 2-D convolution, partitioned over input channels
    Conv {
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        padding: usize,
    },
    /// Fully-connected, partitioned over input features
    Fc { in_features: usize, out_features: usize },
}

impl LayerShape {
    /// Registry name of the layer kind.
    pub fn name(&self) -> &'static str {
        match self {
            LayerShape::Conv { .. } => "conv",
            LayerShape::Fc { .. } => "fc",
        }
    }

    /// Size of the partition axis.
    pub fn in_dim(&self) -> usize {
        match self {
            LayerShape::Conv { in_channels, .. } => *in_channels,
            LayerShape::Fc { in_features, .. } => *in_features,
        }
    }

    /// Crossbar rows used by one element of the partition axis.
    pub fn row_cost(&self) -> usize {
        match self {
            LayerShape::Conv { kernel_size, .. } => kernel_size.saturating_mul(*kernel_size),
            LayerShape::Fc { .. } => 1,
        }
    }
}
