//! Bit-serial quantization simulator for analog compute-in-memory crossbars.
//!
//! Models what happens to a layer's weights and activations when the layer
//! runs on a crossbar accelerator with limited-resolution DACs, storage cells
//! and ADCs:
//! - Symmetric fixed-point quantization with a smoothed activation range
//! - Radix-`2^cell_bit` digit splitting of quantized levels
//! - Input-dimension partitioning across physical sub-arrays
//! - Bit-serial partial sums with per-readout ADC rounding and clipping
//!
//! # Example
//!
//! ```no_run
//! use xbar_quant::{ForwardMode, LayerConfig, WeightLayer};
//!
//! let config = LayerConfig::load("fc1.yaml")?;
//! let mut layer = WeightLayer::with_seed(&config, 7)?;
//! let x = ndarray::ArrayD::<f32>::zeros(ndarray::IxDyn(&[4, 64]));
//!
//! // Calibrate the output range, then run the hardware-accurate path.
//! layer.forward(&x, ForwardMode::QuantAwareTrain, None)?;
//! layer.eval();
//! let input_bit_scale = xbar_quant::BitScale::new(9, 1.0 / 255.0);
//! let y = layer.forward(&x, ForwardMode::HwAccurateInfer, Some(input_bit_scale))?;
//! # Ok::<(), xbar_quant::XbarError>(())
//! ```

pub mod config;
pub mod error;
pub mod quant;
pub mod xbar;

pub use config::{HardwareConfig, LayerConfig, LayerShape, QuantizeBits};
pub use error::{Result, XbarError};
pub use quant::{split_by_bit, BitScale, BitScaleState, Phase, QuantMode, Quantity, Quantizer};
pub use xbar::{
    split_by_num, Conv2dOp, CrossbarLayer, CrossbarOp, ForwardMode, LinearOp, PartitionPlan,
    QatGradients, SubOperation, WeightLayer,
};
