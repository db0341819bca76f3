//! Digit decomposition of quantized levels.

use ndarray::{ArrayD, ArrayViewD};

use crate::error::{Result, XbarError};
use crate::quant::levels::{check_bit_width, cycle, threshold, to_level};

/// Digit `index` of a non-negative magnitude split into `cycles` digits.
///
/// Uses cumulative residues `r_k = m mod 2^(bit_split·k)`, with the last
/// residue taken as `m` itself, so the top digit absorbs any excess.
#[inline]
fn digit(magnitude: i64, index: usize, bit_split: u32, cycles: usize) -> i64 {
    let shift = |k: usize| bit_split as usize * k;
    let residue = |k: usize| {
        if k == 0 {
            0
        } else if k >= cycles {
            magnitude
        } else {
            magnitude % (1i64 << shift(k))
        }
    };
    (residue(index + 1) - residue(index)) >> shift(index)
}

/// Split one signed level into `cycles` signed digits, least significant first.
///
/// # Errors
/// Fails on a zero `bit_split` or `cycles`, when the top digit's shift
/// `bit_split·(cycles-1)` leaves no room in an `i64`, or on `i64::MIN`.
pub fn split_level(level: i64, bit_split: u32, cycles: usize) -> Result<Vec<i64>> {
    let top_shift = (bit_split as usize).checked_mul(cycles.saturating_sub(1));
    if bit_split == 0 || cycles == 0 || top_shift.map_or(true, |shift| shift >= 63) {
        return Err(XbarError::config_value(
            "bit_split",
            format!("{cycles} digits of {bit_split} bits do not fit a 64-bit level"),
            "use bit_split >= 1 with bit_split·(cycles-1) < 63",
        ));
    }
    let magnitude = level.checked_abs().ok_or_else(|| {
        XbarError::config_value("level", "i64::MIN has no magnitude", "levels are bounded by threshold(bits)")
    })?;
    let sign = level.signum();
    Ok((0..cycles).map(|i| sign * digit(magnitude, i, bit_split, cycles)).collect())
}

/// Quantize `data` with `step` to `bit_width` levels and split every level
/// into `ceil((bit_width-1)/bit_split)` digit arrays.
///
/// Each returned array has `data`'s shape and holds integer values in
/// `(-2^bit_split, 2^bit_split)` carrying the sign of the original level.
///
/// # Errors
/// Fails on a bit width outside `[2, MAX_BITS]` or a zero `bit_split`.
pub fn split_by_bit(
    data: &ArrayViewD<'_, f32>,
    step: f32,
    bit_width: u32,
    bit_split: u32,
) -> Result<Vec<ArrayD<f32>>> {
    check_bit_width("bit_width", bit_width, 2)?;
    if bit_split == 0 {
        return Err(XbarError::config_value(
            "bit_split",
            "0 bits per cycle",
            "cell_bit and dac_bit must be at least 1",
        ));
    }
    let cycles = cycle(bit_width, bit_split);
    let thres = threshold(bit_width) as f32;
    let levels = data.mapv(|x| to_level(x, step, thres) as i64);

    Ok((0..cycles)
        .map(|i| {
            levels.mapv(|q| (q.signum() * digit(q.abs(), i, bit_split, cycles)) as f32)
        })
        .collect())
}

/// Recombine digit arrays into levels: `Σ digit_i · 2^(bit_split·i)`.
pub fn combine_digits(digits: &[ArrayD<f32>], bit_split: u32) -> Option<ArrayD<f32>> {
    let (first, rest) = digits.split_first()?;
    let mut total = first.clone();
    for (i, d) in rest.iter().enumerate() {
        let weight = 2f32.powi((bit_split as usize * (i + 1)) as i32);
        total.scaled_add(weight, d);
    }
    Some(total)
}
