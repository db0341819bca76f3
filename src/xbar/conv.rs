//! 2-D convolution primitive, NCHW layout, no bias.
//!
//! Direct nested-loop convolution. Partial-sum inputs in the bit-serial path
//! are small integers, so the loop order is chosen for clarity over speed.

use ndarray::{ArrayD, ArrayViewD, IxDyn};

use super::op::{shape_mismatch, CrossbarOp};
use crate::error::Result;

/// Convolution primitive for `[batch, in_channels, h, w]` inputs and
/// `[out_channels, in_channels, k, k]` weights.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conv2dOp {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
}

/// Resolved sizes for one convolution call.
#[derive(Clone, Copy, Debug)]
struct ConvDims {
    batch: usize,
    channels: usize,
    in_h: usize,
    in_w: usize,
    out_h: usize,
    out_w: usize,
}

impl Conv2dOp {
    /// Create a convolution primitive.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
    ) -> Self {
        Self { in_channels, out_channels, kernel_size, stride, padding }
    }

    /// Square kernel side.
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Spatial output size for an `in_size` input side.
    pub fn output_size(&self, in_size: usize) -> Option<usize> {
        let padded = in_size + 2 * self.padding;
        if padded < self.kernel_size || self.stride == 0 {
            return None;
        }
        Some((padded - self.kernel_size) / self.stride + 1)
    }

    fn dims(&self, input: &[usize], weight: &[usize]) -> Result<ConvDims> {
        let k = self.kernel_size;
        if input.len() != 4 {
            return Err(shape_mismatch("conv input", &[0, 0, 0, 0], input));
        }
        let (batch, channels, in_h, in_w) = (input[0], input[1], input[2], input[3]);
        let expected_weight = [self.out_channels, channels, k, k];
        if weight != expected_weight {
            return Err(shape_mismatch("conv weight", &expected_weight, weight));
        }
        let (out_h, out_w) = match (self.output_size(in_h), self.output_size(in_w)) {
            (Some(h), Some(w)) => (h, w),
            _ => return Err(shape_mismatch("conv input", &[batch, channels, k, k], input)),
        };
        Ok(ConvDims { batch, channels, in_h, in_w, out_h, out_w })
    }

    /// Visit every (output, input, weight) flat-index triple that contributes.
    fn for_each_tap(&self, d: ConvDims, mut visit: impl FnMut(usize, usize, usize)) {
        let k = self.kernel_size;
        let pad = self.padding as isize;
        for n in 0..d.batch {
            for oc in 0..self.out_channels {
                for oh in 0..d.out_h {
                    for ow in 0..d.out_w {
                        let out_idx = ((n * self.out_channels + oc) * d.out_h + oh) * d.out_w + ow;
                        for ic in 0..d.channels {
                            for kh in 0..k {
                                let ih = (oh * self.stride + kh) as isize - pad;
                                if ih < 0 || ih >= d.in_h as isize {
                                    continue;
                                }
                                for kw in 0..k {
                                    let iw = (ow * self.stride + kw) as isize - pad;
                                    if iw < 0 || iw >= d.in_w as isize {
                                        continue;
                                    }
                                    let in_idx = ((n * d.channels + ic) * d.in_h + ih as usize) * d.in_w
                                        + iw as usize;
                                    let w_idx = ((oc * d.channels + ic) * k + kh) * k + kw;
                                    visit(out_idx, in_idx, w_idx);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn flat(view: &ArrayViewD<'_, f32>) -> Vec<f32> {
    view.iter().copied().collect()
}

fn from_flat(shape: &[usize], data: Vec<f32>) -> Result<ArrayD<f32>> {
    let len = data.len();
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| shape_mismatch("conv output", shape, &[len]))
}

impl CrossbarOp for Conv2dOp {
    const NAME: &'static str = "conv";

    fn in_dim(&self) -> usize {
        self.in_channels
    }

    fn out_dim(&self) -> usize {
        self.out_channels
    }

    fn row_cost(&self) -> usize {
        // saturates so an oversized kernel reports zero row capacity
        self.kernel_size.saturating_mul(self.kernel_size)
    }

    fn input_rank(&self) -> usize {
        4
    }

    fn weight_shape(&self, in_dim: usize) -> Vec<usize> {
        vec![self.out_channels, in_dim, self.kernel_size, self.kernel_size]
    }

    fn apply(&self, input: &ArrayViewD<'_, f32>, weight: &ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        let d = self.dims(input.shape(), weight.shape())?;
        let x = flat(input);
        let w = flat(weight);
        let mut out = vec![0.0f32; d.batch * self.out_channels * d.out_h * d.out_w];
        self.for_each_tap(d, |o, i, k| out[o] += x[i] * w[k]);
        from_flat(&[d.batch, self.out_channels, d.out_h, d.out_w], out)
    }

    fn backward(
        &self,
        input: &ArrayViewD<'_, f32>,
        weight: &ArrayViewD<'_, f32>,
        grad_output: &ArrayViewD<'_, f32>,
    ) -> Result<(ArrayD<f32>, ArrayD<f32>)> {
        let d = self.dims(input.shape(), weight.shape())?;
        let expected = [d.batch, self.out_channels, d.out_h, d.out_w];
        if grad_output.shape() != expected {
            return Err(shape_mismatch("conv grad", &expected, grad_output.shape()));
        }
        let x = flat(input);
        let w = flat(weight);
        let g = flat(grad_output);
        let mut grad_input = vec![0.0f32; x.len()];
        let mut grad_weight = vec![0.0f32; w.len()];
        self.for_each_tap(d, |o, i, k| {
            grad_input[i] += g[o] * w[k];
            grad_weight[k] += g[o] * x[i];
        });
        Ok((from_flat(input.shape(), grad_input)?, from_flat(weight.shape(), grad_weight)?))
    }
}
