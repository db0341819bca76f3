//! The capability pair a crossbar layer needs from its linear primitive.

use ndarray::{ArrayD, ArrayViewD};

use crate::error::{Result, XbarError};

/// A bias-free linear primitive that can run on crossbar sub-arrays.
///
/// Inputs and weights share axis 1 as the partition axis, so a layer can
/// slice both and sum the partial outputs.
pub trait CrossbarOp: Clone + std::fmt::Debug {
    /// Registry name of the layer kind.
    const NAME: &'static str;

    /// Full size of the partition axis (input channels or input features).
    fn in_dim(&self) -> usize;

    /// Output channels or output features.
    fn out_dim(&self) -> usize;

    /// Crossbar rows used by one element of the partition axis.
    fn row_cost(&self) -> usize;

    /// Rank of the input tensor, batch axis included.
    fn input_rank(&self) -> usize;

    /// Weight shape for a partition holding `in_dim` input elements.
    fn weight_shape(&self, in_dim: usize) -> Vec<usize>;

    /// Run the primitive on one (possibly sliced) input and weight.
    fn apply(&self, input: &ArrayViewD<'_, f32>, weight: &ArrayViewD<'_, f32>) -> Result<ArrayD<f32>>;

    /// Adjoint of [`apply`](Self::apply): gradients w.r.t. input and weight.
    fn backward(
        &self,
        input: &ArrayViewD<'_, f32>,
        weight: &ArrayViewD<'_, f32>,
        grad_output: &ArrayViewD<'_, f32>,
    ) -> Result<(ArrayD<f32>, ArrayD<f32>)>;
}

/// One crossbar sub-array's share of the layer weight.
#[derive(Clone, Debug, PartialEq)]
pub struct SubOperation {
    weight: ArrayD<f32>,
}

impl SubOperation {
    /// Wrap a weight slice; axis 1 is its input dimension.
    pub fn new(weight: ArrayD<f32>) -> Self {
        Self { weight }
    }

    /// Input elements this sub-array holds.
    pub fn in_dim(&self) -> usize {
        self.weight.shape().get(1).copied().unwrap_or(0)
    }

    /// The full-precision weight slice.
    pub fn weight(&self) -> &ArrayD<f32> {
        &self.weight
    }

    /// Apply `op` to a matching input slice with this sub-array's weight.
    pub fn forward<O: CrossbarOp>(&self, op: &O, input: &ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        op.apply(input, &self.weight.view())
    }
}

pub(crate) fn shape_mismatch(context: &'static str, expected: &[usize], actual: &[usize]) -> XbarError {
    XbarError::ShapeMismatch { context, expected: expected.to_vec(), actual: actual.to_vec() }
}
