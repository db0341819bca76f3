//! Integer level arithmetic shared by every rounding site.

use crate::error::{Result, XbarError};

/// Widest bit width any quantity or converter may use.
///
/// Keeps every level and every positional weight exact in `f32`.
pub const MAX_BITS: u32 = 24;

/// Largest `|point_shift|` a crossbar may use.
pub const MAX_POINT_SHIFT: i32 = 64;

/// Largest representable level of a symmetric `bit_width`-bit quantity.
///
/// `2^(bit_width-1) - 1`, so 8 bits gives 127 and 1 bit gives 0.
#[inline]
pub fn threshold(bit_width: u32) -> i64 {
    if bit_width == 0 {
        return 0;
    }
    (1i64 << (bit_width - 1)) - 1
}

/// Number of `bit_split`-bit digits needed for the magnitude of a
/// `bit_width`-bit signed level: `ceil((bit_width - 1) / bit_split)`.
#[inline]
pub fn cycle(bit_width: u32, bit_split: u32) -> usize {
    debug_assert!(bit_split > 0, "bit_split must be positive");
    (bit_width.saturating_sub(1) as usize).div_ceil(bit_split as usize)
}

/// Round to the nearest integer, ties to even.
///
/// Weights, activations and partial sums all go through this function so the
/// hardware-accurate path is bit-exact across runs.
#[inline]
pub fn round_level(x: f32) -> f32 {
    x.round_ties_even()
}

/// Map a real value to its clamped integer level for the given step.
///
/// A non-positive step maps everything to level zero.
#[inline]
pub fn to_level(value: f32, step: f32, thres: f32) -> f32 {
    if step <= 0.0 {
        return 0.0;
    }
    round_level(value / step).clamp(-thres, thres)
}

/// Validate a bit width against `[min, MAX_BITS]`.
pub fn check_bit_width(field: &str, bits: u32, min: u32) -> Result<()> {
    if bits < min || bits > MAX_BITS {
        return Err(XbarError::config_value(
            field,
            format!("{bits} is outside [{min}, {MAX_BITS}]"),
            format!("use a bit width between {min} and {MAX_BITS}"),
        ));
    }
    Ok(())
}
