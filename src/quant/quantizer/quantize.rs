//! Quantize operation with Straight-Through Estimator (STE).

use ndarray::{ArrayD, ArrayViewD};
use tracing::warn;

use super::config::{Phase, QuantMode, QuantizeConfig};
use crate::error::{Result, XbarError};
use crate::quant::levels::{check_bit_width, threshold, to_level};
use crate::quant::state::BitScale;

/// Weight kept on the committed range when blending in a new data estimate.
pub const RANGE_MOMENTUM: f32 = 0.707;

/// Standard deviations spanned by a data-driven activation range.
pub const RANGE_SIGMA: f32 = 3.0;

/// Scale estimator and quantizer for one layer.
///
/// Both range heuristics are tunable per layer through [`QuantizeBits`].
///
/// [`QuantizeBits`]: crate::config::QuantizeBits
#[derive(Clone, Debug, PartialEq)]
pub struct Quantizer {
    /// Share of the committed range kept on each training update
    pub momentum: f32,
    /// Multiplier on the standard deviation in the data estimate
    pub sigma: f32,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self { momentum: RANGE_MOMENTUM, sigma: RANGE_SIGMA }
    }
}

impl Quantizer {
    /// Create a quantizer with custom range heuristics
    pub fn new(momentum: f32, sigma: f32) -> Self {
        Self { momentum, sigma }
    }

    /// Estimate the full-scale range for `data`.
    ///
    /// - weight: `max(|data|)`
    /// - activation/test: the committed range `last.step * threshold(last.bits)`
    /// - activation/train: `sigma·std + |mean|`, blended with the committed
    ///   range as `momentum·committed + (1 - momentum)·estimate` once one exists
    ///
    /// # Errors
    /// Fails when an activation request carries no phase.
    pub fn estimate_scale(
        &self,
        data: &ArrayViewD<'_, f32>,
        config: &QuantizeConfig,
        last: BitScale,
    ) -> Result<f32> {
        match config.mode {
            QuantMode::Weight => Ok(data.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))),
            QuantMode::Activation => {
                let committed = last.range();
                match config.phase {
                    Some(Phase::Train) => {
                        let estimate = self.data_range(data);
                        if committed <= 0.0 {
                            Ok(estimate)
                        } else {
                            Ok(self.momentum * committed + (1.0 - self.momentum) * estimate)
                        }
                    }
                    Some(Phase::Test) => {
                        if committed > 0.0 {
                            Ok(committed)
                        } else {
                            warn!(committed, "no committed activation range, estimating from data");
                            Ok(self.data_range(data))
                        }
                    }
                    None => Err(XbarError::config_value(
                        "phase",
                        "activation quantization needs a phase",
                        "use Phase::Train or Phase::Test",
                    )),
                }
            }
        }
    }

    /// Estimate a scale, quantize `data` to `config.bits` and commit the step into `row`.
    pub fn quantize(
        &self,
        data: &ArrayViewD<'_, f32>,
        config: &QuantizeConfig,
        row: &mut BitScale,
    ) -> Result<ArrayD<f32>> {
        check_bit_width(&config.mode.to_string(), config.bits, 2)?;
        let scale = self.estimate_scale(data, config, *row)?;
        Ok(quantize(data, config.bits, scale, row))
    }

    /// Backward pass: Straight-Through Estimator (STE)
    ///
    /// ∂L/∂x = ∂L/∂y. Scale and bit width receive no gradient.
    pub fn backward(&self, grad_output: &ArrayD<f32>) -> ArrayD<f32> {
        ste_backward(grad_output)
    }

    /// `sigma·std + |mean|`, with the unbiased standard deviation.
    fn data_range(&self, data: &ArrayViewD<'_, f32>) -> f32 {
        let n = data.len();
        if n == 0 {
            return 0.0;
        }
        let mean = data.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
        let std = if n < 2 {
            0.0
        } else {
            let var = data.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            var.sqrt()
        };
        (self.sigma as f64 * std + mean.abs()) as f32
    }
}

/// Quantize `data` to the `2·threshold(bits)+1` levels spanning `±scale`.
///
/// Returns `clamp(round(x / step), -t, t) * step` with `step = scale / t`
/// and commits `(bits, step)` into `row`. A non-positive scale yields zeros
/// and a zero step.
pub fn quantize(data: &ArrayViewD<'_, f32>, bits: u32, scale: f32, row: &mut BitScale) -> ArrayD<f32> {
    let thres = threshold(bits) as f32;
    let step = if scale > 0.0 && thres > 0.0 { scale / thres } else { 0.0 };
    if step == 0.0 {
        warn!(scale, bits, "non-positive quantization scale, output is all zeros");
    }
    *row = BitScale::new(bits, step);
    data.mapv(|x| to_level(x, step, thres) * step)
}

/// Convenience function for STE backward pass
pub fn ste_backward(grad_output: &ArrayD<f32>) -> ArrayD<f32> {
    grad_output.clone()
}
