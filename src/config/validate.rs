//! Layer config validation
//!
//! Rejects configurations that would divide by zero or leave a crossbar
//! without a single usable row.

use super::schema::{HardwareConfig, LayerConfig, LayerShape, QuantizeBits};
use crate::error::{Result, XbarError};
use crate::quant::{check_bit_width, MAX_POINT_SHIFT};

/// Validate a layer configuration
///
/// Checks:
/// - Quantity bit widths in `[2, MAX_BITS]`, converter widths in range
/// - Range heuristics: `momentum` in `[0, 1)`, `sigma > 0`
/// - Non-zero crossbar rows, shape dimensions and stride
/// - `|point_shift| <= MAX_POINT_SHIFT`
/// - At least one partition element fits on a crossbar
pub fn validate_layer_config(config: &LayerConfig) -> Result<()> {
    validate_bits(&config.quantize)?;
    validate_hardware(&config.hardware)?;
    validate_shape(&config.layer)?;

    let row_cost = config.layer.row_cost();
    if config.hardware.xbar_row / row_cost == 0 {
        return Err(XbarError::ZeroRowCapacity { xbar_row: config.hardware.xbar_row, row_cost });
    }
    Ok(())
}

pub(crate) fn validate_bits(bits: &QuantizeBits) -> Result<()> {
    check_bit_width("quantize.input", bits.input, 2)?;
    check_bit_width("quantize.weight", bits.weight, 2)?;
    check_bit_width("quantize.output", bits.output, 2)?;

    if !(0.0..1.0).contains(&bits.momentum) {
        return Err(XbarError::config_value(
            "quantize.momentum",
            format!("{} is outside [0, 1)", bits.momentum),
            "use 0.707 unless tuning the activation range",
        ));
    }
    if bits.sigma.is_nan() || bits.sigma <= 0.0 {
        return Err(XbarError::config_value(
            "quantize.sigma",
            format!("{} must be > 0", bits.sigma),
            "use 3.0 unless tuning the activation range",
        ));
    }
    Ok(())
}

pub(crate) fn validate_hardware(hw: &HardwareConfig) -> Result<()> {
    if hw.xbar_row == 0 {
        return Err(XbarError::config_value(
            "hardware.xbar_row",
            "must be > 0",
            "set the number of physical crossbar rows",
        ));
    }
    check_bit_width("hardware.cell_bit", hw.cell_bit, 1)?;
    check_bit_width("hardware.dac_bit", hw.dac_bit, 1)?;
    check_bit_width("hardware.adc_bit", hw.adc_bit, 2)?;
    if hw.point_shift.unsigned_abs() > MAX_POINT_SHIFT.unsigned_abs() {
        return Err(XbarError::config_value(
            "hardware.point_shift",
            format!("{} is outside [-{MAX_POINT_SHIFT}, {MAX_POINT_SHIFT}]", hw.point_shift),
            "point_shift is a small signed headroom, typically between -4 and 4",
        ));
    }
    Ok(())
}

fn validate_shape(shape: &LayerShape) -> Result<()> {
    let positive = |field: &str, value: usize| {
        if value == 0 {
            Err(XbarError::config_value(format!("layer.{field}"), "must be > 0", "check the layer shape"))
        } else {
            Ok(())
        }
    };
    match shape {
        LayerShape::Conv { in_channels, out_channels, kernel_size, stride, .. } => {
            if *in_channels == 0 {
                return Err(XbarError::EmptyDimension);
            }
            positive("out_channels", *out_channels)?;
            positive("kernel_size", *kernel_size)?;
            positive("stride", *stride)
        }
        LayerShape::Fc { in_features, out_features } => {
            if *in_features == 0 {
                return Err(XbarError::EmptyDimension);
            }
            positive("out_features", *out_features)
        }
    }
}
