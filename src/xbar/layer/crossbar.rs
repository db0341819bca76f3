//! The crossbar layer and its three forward paths.

use ndarray::{concatenate, ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use super::mode::ForwardMode;
use crate::config::{validate, HardwareConfig, QuantizeBits};
use crate::error::{Result, XbarError};
use crate::quant::{
    check_bit_width, cycle, round_level, split_by_bit, threshold, BitScale, BitScaleState, Phase,
    QuantizeConfig, Quantity, Quantizer,
};
use crate::xbar::op::{shape_mismatch, CrossbarOp, SubOperation};
use crate::xbar::partition::PartitionPlan;

/// Input and quantized weight of the last training forward.
#[derive(Clone, Debug)]
struct QatCache {
    input: ArrayD<f32>,
    weight: ArrayD<f32>,
}

/// Gradients of a quant-aware training forward.
#[derive(Clone, Debug, PartialEq)]
pub struct QatGradients {
    /// ∂L/∂input, same shape as the forward input
    pub input: ArrayD<f32>,
    /// ∂L/∂weight for the full (concatenated) full-precision weight
    pub weight: ArrayD<f32>,
}

/// A weight layer mapped onto crossbar sub-arrays.
///
/// Generic over the primitive `O`; all quantization, splitting and
/// accumulation logic lives here.
#[derive(Clone, Debug)]
pub struct CrossbarLayer<O: CrossbarOp> {
    op: O,
    hardware: HardwareConfig,
    plan: PartitionPlan,
    subs: Vec<SubOperation>,
    state: BitScaleState,
    quantizer: Quantizer,
    training: bool,
    cache: Option<QatCache>,
}

impl<O: CrossbarOp> CrossbarLayer<O> {
    /// Build a layer with randomly initialised weights.
    pub fn new(op: O, hardware: HardwareConfig, bits: &QuantizeBits) -> Result<Self> {
        Self::build(op, hardware, bits, &mut StdRng::from_os_rng())
    }

    /// Build a layer with a seed for reproducibility
    pub fn with_seed(op: O, hardware: HardwareConfig, bits: &QuantizeBits, seed: u64) -> Result<Self> {
        Self::build(op, hardware, bits, &mut StdRng::seed_from_u64(seed))
    }

    fn build<R: Rng>(op: O, hardware: HardwareConfig, bits: &QuantizeBits, rng: &mut R) -> Result<Self> {
        validate::validate_bits(bits)?;
        validate::validate_hardware(&hardware)?;
        if op.out_dim() == 0 {
            return Err(XbarError::config_value("out_dim", "must be > 0", "check the layer shape"));
        }
        let plan = PartitionPlan::new(op.in_dim(), hardware.xbar_row, op.row_cost())?;
        let subs = plan
            .sizes()
            .iter()
            .map(|&size| {
                // uniform in ±1/sqrt(fan_in)
                let bound = 1.0 / ((size * op.row_cost()) as f32).sqrt();
                let weight = ArrayD::from_shape_simple_fn(IxDyn(&op.weight_shape(size)), || {
                    rng.random_range(-bound..bound)
                });
                SubOperation::new(weight)
            })
            .collect();
        debug!(
            kind = O::NAME,
            in_dim = op.in_dim(),
            rows_per_partition = plan.rows_per_partition(),
            partitions = plan.len(),
            "built crossbar layer"
        );
        Ok(Self {
            op,
            hardware,
            plan,
            subs,
            state: BitScaleState::new(bits.input, bits.weight, bits.output),
            quantizer: Quantizer::new(bits.momentum, bits.sigma),
            training: true,
            cache: None,
        })
    }

    /// The linear primitive.
    pub fn op(&self) -> &O {
        &self.op
    }

    /// Hardware parameters.
    pub fn hardware(&self) -> &HardwareConfig {
        &self.hardware
    }

    /// Partition layout over crossbar sub-arrays.
    pub fn plan(&self) -> &PartitionPlan {
        &self.plan
    }

    /// One entry per crossbar sub-array, in partition order.
    pub fn sub_operations(&self) -> &[SubOperation] {
        &self.subs
    }

    /// The layer's scale estimator.
    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// Current `(bit_width, step)` table.
    pub fn bit_scale_state(&self) -> &BitScaleState {
        &self.state
    }

    /// Mutable handle on the `(bit_width, step)` table.
    pub fn bit_scale_state_mut(&mut self) -> &mut BitScaleState {
        &mut self.state
    }

    /// Committed output `(bit_width, step)`, the next layer's input range.
    pub fn output_bit_scale(&self) -> BitScale {
        self.state.get(Quantity::Output)
    }

    /// Set training mode
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Set evaluation mode
    pub fn eval(&mut self) {
        self.training = false;
        self.cache = None;
    }

    /// Check if in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Full weight, sub-array slices concatenated along the partition axis.
    pub fn weight(&self) -> Result<ArrayD<f32>> {
        let views: Vec<_> = self.subs.iter().map(|s| s.weight().view()).collect();
        concatenate(Axis(1), &views).map_err(|_| {
            shape_mismatch("weight concat", &self.op.weight_shape(self.op.in_dim()), &[])
        })
    }

    /// Replace the full weight, re-slicing it across sub-arrays.
    pub fn set_weight(&mut self, weight: &ArrayD<f32>) -> Result<()> {
        let expected = self.op.weight_shape(self.op.in_dim());
        if weight.shape() != expected.as_slice() {
            return Err(shape_mismatch("set_weight", &expected, weight.shape()));
        }
        self.subs = self
            .plan
            .ranges()
            .map(|range| SubOperation::new(weight.slice_axis(Axis(1), Slice::from(range)).to_owned()))
            .collect();
        self.cache = None;
        Ok(())
    }

    /// Evaluate the layer.
    ///
    /// `input_bit_scale` is the previous layer's committed output range and
    /// is required by [`ForwardMode::HwAccurateInfer`]; other modes ignore it.
    ///
    /// # Errors
    /// Fails on an input whose rank or partition axis does not match the
    /// layer, on hardware-accurate inference while training, or when a
    /// needed scale is missing.
    pub fn forward(
        &mut self,
        inputs: &ArrayD<f32>,
        mode: ForwardMode,
        input_bit_scale: Option<BitScale>,
    ) -> Result<ArrayD<f32>> {
        self.check_input(inputs)?;
        debug!(kind = O::NAME, %mode, training = self.training, "forward");
        match mode {
            ForwardMode::FullPrecision => self.forward_full_precision(inputs),
            ForwardMode::QuantAwareTrain => self.forward_quant_aware(inputs),
            ForwardMode::HwAccurateInfer => self.forward_hw_accurate(inputs, input_bit_scale),
        }
    }

    /// Straight-through backward of the last quant-aware training forward.
    ///
    /// The gradient passes both quantizers unchanged and goes through the
    /// primitive's adjoint evaluated at the quantized weight.
    pub fn backward(&self, grad_output: &ArrayD<f32>) -> Result<QatGradients> {
        let cache = self.cache.as_ref().ok_or(XbarError::NoForwardCache)?;
        let grad = self.quantizer.backward(grad_output);
        let (input, weight) =
            self.op.backward(&cache.input.view(), &cache.weight.view(), &grad.view())?;
        Ok(QatGradients { input, weight: self.quantizer.backward(&weight) })
    }

    fn check_input(&self, inputs: &ArrayD<f32>) -> Result<()> {
        let shape = inputs.shape();
        if shape.len() != self.op.input_rank() || shape[1] != self.plan.in_dim() {
            let mut expected = shape.to_vec();
            expected.resize(self.op.input_rank(), 0);
            if expected.len() > 1 {
                expected[1] = self.plan.in_dim();
            }
            return Err(shape_mismatch("layer input", &expected, shape));
        }
        Ok(())
    }

    fn input_slices<'a>(&'a self, inputs: &'a ArrayD<f32>) -> impl Iterator<Item = ArrayViewD<'a, f32>> + 'a {
        self.plan.ranges().map(move |range| inputs.slice_axis(Axis(1), Slice::from(range)))
    }

    fn forward_full_precision(&self, inputs: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let mut total = None;
        for (sub, x) in self.subs.iter().zip(self.input_slices(inputs)) {
            accumulate(&mut total, sub.forward(&self.op, &x)?);
        }
        total.ok_or(XbarError::EmptyDimension)
    }

    fn forward_quant_aware(&mut self, inputs: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let weight = self.weight()?;
        let weight_cfg = QuantizeConfig::weight(self.state.get(Quantity::Weight).bits);
        let quantized_weight =
            self.quantizer.quantize(&weight.view(), &weight_cfg, self.state.row_mut(Quantity::Weight))?;

        let output = self.op.apply(&inputs.view(), &quantized_weight.view())?;
        let output_cfg = QuantizeConfig::activation(
            self.state.get(Quantity::Output).bits,
            Phase::from_training(self.training),
        );
        let quantized_output =
            self.quantizer.quantize(&output.view(), &output_cfg, self.state.row_mut(Quantity::Output))?;

        self.cache = self.training.then(|| QatCache { input: inputs.clone(), weight: quantized_weight });
        Ok(quantized_output)
    }

    fn forward_hw_accurate(
        &mut self,
        inputs: &ArrayD<f32>,
        input_bit_scale: Option<BitScale>,
    ) -> Result<ArrayD<f32>> {
        if self.training {
            return Err(XbarError::TrainingState {
                operation: "hardware-accurate inference",
                state: "training",
                hint: "eval",
            });
        }
        let input = input_bit_scale.filter(BitScale::is_set).ok_or(XbarError::MissingInputScale)?;
        check_bit_width("input bits", input.bits, 2)?;
        self.state.set(Quantity::Input, input);
        self.commit_weight_step()?;

        let output = self.state.get(Quantity::Output);
        if output.step <= 0.0 {
            return Err(XbarError::Uncalibrated { quantity: "output" });
        }
        let weight = self.state.get(Quantity::Weight);
        let HardwareConfig { cell_bit, dac_bit, adc_bit, point_shift, .. } = self.hardware;

        let weight_cycle = cycle(weight.bits, cell_bit);
        let input_cycle = cycle(input.bits, dac_bit);
        let output_scale = output.range() as f64;
        let mul_scale = weight.step as f64
            * input.step as f64
            * 2f64.powi(((weight_cycle - 1) * cell_bit as usize) as i32)
            * 2f64.powi(((input_cycle - 1) * dac_bit as usize) as i32);
        let transfer_exp = point_shift.checked_add(adc_bit as i32 - 1).ok_or_else(|| {
            XbarError::config_value(
                "hardware.point_shift",
                format!("{point_shift} + adc_bit overflows"),
                "keep point_shift within the validated range",
            )
        })?;
        let transfer_scale = 2f64.powi(transfer_exp);
        let gain = (mul_scale / output_scale * transfer_scale) as f32;
        let adc_thres = threshold(adc_bit) as f32;
        debug!(weight_cycle, input_cycle, gain, "bit-serial inference");

        let mut total = None;
        for (p, (sub, x)) in self.subs.iter().zip(self.input_slices(inputs)).enumerate() {
            let weight_digits = split_by_bit(&sub.weight().view(), weight.step, weight.bits, cell_bit)?;
            let input_digits = split_by_bit(&x, input.step, input.bits, dac_bit)?;
            trace!(partition = p, in_dim = sub.in_dim(), "accumulating digit pairs");

            for (i, x_digit) in input_digits.iter().enumerate() {
                for (j, w_digit) in weight_digits.iter().enumerate() {
                    let partial = self.op.apply(&x_digit.view(), &w_digit.view())?;
                    let scale_point = (input_cycle - 1 - i) * dac_bit as usize
                        + (weight_cycle - 1 - j) * cell_bit as usize;
                    let readout = (transfer_scale * 2f64.powi(scale_point as i32)) as f32;
                    let partial = partial
                        .mapv_into(|v| round_level(v * gain).clamp(-adc_thres, adc_thres) / readout);
                    accumulate(&mut total, partial);
                }
            }
        }

        let total = total.ok_or(XbarError::EmptyDimension)?;
        let out_thres = threshold(output.bits) as f32;
        Ok(total.mapv_into(|v| round_level(v * out_thres).clamp(-out_thres, out_thres) * output.step))
    }

    /// Derive and commit the weight step if no quant-aware pass has done so.
    fn commit_weight_step(&mut self) -> Result<()> {
        if self.state.get(Quantity::Weight).is_set() {
            return Ok(());
        }
        warn!(kind = O::NAME, "weight step not committed, deriving it from the current weights");
        let weight = self.weight()?;
        let cfg = QuantizeConfig::weight(self.state.get(Quantity::Weight).bits);
        self.quantizer.quantize(&weight.view(), &cfg, self.state.row_mut(Quantity::Weight))?;
        Ok(())
    }
}

fn accumulate(total: &mut Option<ArrayD<f32>>, partial: ArrayD<f32>) {
    match total {
        Some(acc) => *acc += &partial,
        None => *total = Some(partial),
    }
}
