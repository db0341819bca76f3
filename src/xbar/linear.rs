//! Fully-connected primitive: `y = x · Wᵀ`, no bias.

use ndarray::{ArrayD, ArrayView2, ArrayViewD, Ix2};

use super::op::{shape_mismatch, CrossbarOp};
use crate::error::Result;

/// Matrix-multiply primitive for `[batch, in_features]` inputs and
/// `[out_features, in_features]` weights.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearOp {
    in_features: usize,
    out_features: usize,
}

impl LinearOp {
    /// Create a fully-connected primitive.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self { in_features, out_features }
    }

    fn views<'a>(
        &self,
        input: &'a ArrayViewD<'_, f32>,
        weight: &'a ArrayViewD<'_, f32>,
    ) -> Result<(ArrayView2<'a, f32>, ArrayView2<'a, f32>)> {
        let x = input
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| shape_mismatch("linear input", &[0, 0], input.shape()))?;
        let w = weight
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| shape_mismatch("linear weight", &[self.out_features, 0], weight.shape()))?;
        if w.nrows() != self.out_features || w.ncols() != x.ncols() {
            return Err(shape_mismatch(
                "linear weight",
                &[self.out_features, x.ncols()],
                weight.shape(),
            ));
        }
        Ok((x, w))
    }
}

impl CrossbarOp for LinearOp {
    const NAME: &'static str = "fc";

    fn in_dim(&self) -> usize {
        self.in_features
    }

    fn out_dim(&self) -> usize {
        self.out_features
    }

    fn row_cost(&self) -> usize {
        1
    }

    fn input_rank(&self) -> usize {
        2
    }

    fn weight_shape(&self, in_dim: usize) -> Vec<usize> {
        vec![self.out_features, in_dim]
    }

    fn apply(&self, input: &ArrayViewD<'_, f32>, weight: &ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        let (x, w) = self.views(input, weight)?;
        Ok(x.dot(&w.t()).into_dyn())
    }

    fn backward(
        &self,
        input: &ArrayViewD<'_, f32>,
        weight: &ArrayViewD<'_, f32>,
        grad_output: &ArrayViewD<'_, f32>,
    ) -> Result<(ArrayD<f32>, ArrayD<f32>)> {
        let (x, w) = self.views(input, weight)?;
        let g = grad_output
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| shape_mismatch("linear grad", &[x.nrows(), w.nrows()], grad_output.shape()))?;
        if g.dim() != (x.nrows(), w.nrows()) {
            return Err(shape_mismatch("linear grad", &[x.nrows(), w.nrows()], grad_output.shape()));
        }
        Ok((g.dot(&w).into_dyn(), g.t().dot(&x).into_dyn()))
    }
}
