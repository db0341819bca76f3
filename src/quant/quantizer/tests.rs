//! Tests for the quantizer.

use super::*;
use crate::quant::{threshold, BitScale};
use approx::assert_abs_diff_eq;
use ndarray::{ArrayD, IxDyn};
use proptest::prelude::*;

fn array(values: &[f32]) -> ArrayD<f32> {
    ArrayD::from_shape_vec(IxDyn(&[values.len()]), values.to_vec()).unwrap()
}

// ========================================================================
// PROPERTY TESTS - Quantization correctness
// ========================================================================

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(200))]

    /// Quantizing an already quantized array is a fixed point
    #[test]
    fn prop_quantize_idempotent(
        values in prop::collection::vec(-10.0f32..10.0, 1..64),
        bits in 2u32..12,
        scale in 0.1f32..20.0,
    ) {
        let input = array(&values);
        let mut row = BitScale::unset(bits);
        let once = quantize(&input.view(), bits, scale, &mut row);
        let twice = quantize(&once.view(), bits, scale, &mut row);
        prop_assert_eq!(once, twice);
    }

    /// Output has at most 2·threshold+1 distinct levels, all within ±scale
    #[test]
    fn prop_quantize_levels_bounded(
        values in prop::collection::vec(-100.0f32..100.0, 1..64),
        bits in 2u32..9,
        scale in 0.5f32..50.0,
    ) {
        let input = array(&values);
        let mut row = BitScale::unset(bits);
        let output = quantize(&input.view(), bits, scale, &mut row);
        let thres = threshold(bits) as f32;

        prop_assert_eq!(row.bits, bits);
        prop_assert!((row.step - scale / thres).abs() < 1e-6);
        for &val in output.iter() {
            let level = val / row.step;
            prop_assert!((level - level.round()).abs() < 1e-3, "{} is not a level", val);
            prop_assert!(level.round().abs() <= thres);
            prop_assert!(val.abs() <= scale * (1.0 + 1e-5));
        }
    }

    /// With no committed range, training uses the data estimate exactly;
    /// otherwise the result lies between the estimate and the committed range
    #[test]
    fn prop_train_range_smoothing(
        values in prop::collection::vec(-5.0f32..5.0, 2..64),
        committed_step in prop::option::of(0.01f32..1.0),
    ) {
        let q = Quantizer::default();
        let input = array(&values);
        let cfg = QuantizeConfig::activation(8, Phase::Train);
        let fresh = q.estimate_scale(&input.view(), &cfg, BitScale::unset(8)).unwrap();

        match committed_step {
            None => {
                let scale = q.estimate_scale(&input.view(), &cfg, BitScale::unset(8)).unwrap();
                prop_assert_eq!(scale, fresh);
            }
            Some(step) => {
                let last = BitScale::new(8, step);
                let r = last.range();
                let scale = q.estimate_scale(&input.view(), &cfg, last).unwrap();
                let expected = 0.707 * r + 0.293 * fresh;
                prop_assert!((scale - expected).abs() < 1e-4 * expected.max(1.0));
                let (lo, hi) = if r < fresh { (r, fresh) } else { (fresh, r) };
                prop_assert!(scale >= lo - 1e-5 && scale <= hi + 1e-5);
                if (r - fresh).abs() > 1e-3 {
                    prop_assert!(scale > lo && scale < hi);
                }
            }
        }
    }

    /// STE backward should always pass gradients unchanged
    #[test]
    fn prop_ste_backward_identity(
        grad in prop::collection::vec(-10.0f32..10.0, 1..32),
    ) {
        let grad = array(&grad);
        let q = Quantizer::default();
        prop_assert_eq!(q.backward(&grad), grad.clone());
        prop_assert_eq!(ste_backward(&grad), grad);
    }
}

// ========================================================================
// UNIT TESTS
// ========================================================================

#[test]
fn test_weight_scale_is_max_abs() {
    let q = Quantizer::default();
    let w = array(&[0.5, -2.0, 1.0]);
    let scale = q.estimate_scale(&w.view(), &QuantizeConfig::weight(8), BitScale::unset(8)).unwrap();
    assert_eq!(scale, 2.0);
}

#[test]
fn test_weight_quantize_commits_step() {
    let q = Quantizer::default();
    let w = array(&[0.5, -2.0, 0.9]);
    let mut row = BitScale::unset(4);
    let out = q.quantize(&w.view(), &QuantizeConfig::weight(4), &mut row).unwrap();

    // step = 2/7; 0.5/step = 1.75 -> 2, 0.9/step = 3.15 -> 3
    assert_abs_diff_eq!(row.step, 2.0 / 7.0, epsilon = 1e-7);
    assert_abs_diff_eq!(out[0], 2.0 * 2.0 / 7.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out[1], -2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out[2], 3.0 * 2.0 / 7.0, epsilon = 1e-6);
}

#[test]
fn test_activation_train_data_range() {
    let q = Quantizer::default();
    // mean 2.5, unbiased std = sqrt(5/3)
    let x = array(&[1.0, 2.0, 3.0, 4.0]);
    let cfg = QuantizeConfig::activation(8, Phase::Train);
    let scale = q.estimate_scale(&x.view(), &cfg, BitScale::unset(8)).unwrap();
    let expected = 3.0 * (5.0f32 / 3.0).sqrt() + 2.5;
    assert_abs_diff_eq!(scale, expected, epsilon = 1e-5);
}

#[test]
fn test_activation_train_blends_committed_range() {
    let q = Quantizer::default();
    let x = array(&[1.0, 2.0, 3.0, 4.0]);
    let cfg = QuantizeConfig::activation(8, Phase::Train);
    let fresh = q.estimate_scale(&x.view(), &cfg, BitScale::unset(8)).unwrap();
    let last = BitScale::new(8, 0.1);
    let scale = q.estimate_scale(&x.view(), &cfg, last).unwrap();
    assert_abs_diff_eq!(scale, 0.707 * 12.7 + 0.293 * fresh, epsilon = 1e-4);
}

#[test]
fn test_activation_test_reuses_committed_range() {
    let q = Quantizer::default();
    let x = array(&[100.0, -100.0]);
    let cfg = QuantizeConfig::activation(8, Phase::Test);
    let scale = q.estimate_scale(&x.view(), &cfg, BitScale::new(4, 0.5)).unwrap();
    assert_abs_diff_eq!(scale, 3.5, epsilon = 1e-6);
}

#[test]
fn test_activation_test_without_range_falls_back_to_data() {
    let q = Quantizer::default();
    let x = array(&[2.0, 2.0]);
    let cfg = QuantizeConfig::activation(8, Phase::Test);
    let scale = q.estimate_scale(&x.view(), &cfg, BitScale::unset(8)).unwrap();
    assert_abs_diff_eq!(scale, 2.0, epsilon = 1e-6);
}

#[test]
fn test_activation_without_phase_fails() {
    let q = Quantizer::default();
    let x = array(&[1.0]);
    let cfg = QuantizeConfig { mode: QuantMode::Activation, phase: None, bits: 8 };
    let err = q.estimate_scale(&x.view(), &cfg, BitScale::unset(8)).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_quantize_rejects_one_bit() {
    let q = Quantizer::default();
    let x = array(&[1.0]);
    let mut row = BitScale::unset(1);
    assert!(q.quantize(&x.view(), &QuantizeConfig::weight(1), &mut row).is_err());
}

#[test]
fn test_zero_weights_quantize_to_zero() {
    let q = Quantizer::default();
    let w = array(&[0.0, 0.0]);
    let mut row = BitScale::unset(8);
    let out = q.quantize(&w.view(), &QuantizeConfig::weight(8), &mut row).unwrap();
    assert_eq!(row.step, 0.0);
    assert!(out.iter().all(|&v| v == 0.0));
}

#[test]
fn test_custom_momentum() {
    let q = Quantizer::new(0.5, 3.0);
    let x = array(&[1.0, 1.0]);
    let cfg = QuantizeConfig::activation(2, Phase::Train);
    // data range = 1.0, committed = 3.0 * 1
    let scale = q.estimate_scale(&x.view(), &cfg, BitScale::new(2, 3.0)).unwrap();
    assert_abs_diff_eq!(scale, 2.0, epsilon = 1e-6);
}

#[test]
fn test_mode_and_phase_parsing() {
    assert_eq!("weight".parse::<QuantMode>().unwrap(), QuantMode::Weight);
    assert_eq!("activation".parse::<QuantMode>().unwrap(), QuantMode::Activation);
    assert_eq!("train".parse::<Phase>().unwrap(), Phase::Train);
    assert_eq!("test".parse::<Phase>().unwrap(), Phase::Test);
    assert!("bias".parse::<QuantMode>().is_err());
    assert!("eval".parse::<Phase>().unwrap_err().is_config_error());
    assert_eq!(Phase::from_training(true), Phase::Train);
    assert_eq!(Phase::from_training(false), Phase::Test);
}
