//! Quantization: fixed-point levels, scale bookkeeping and bit splitting
//!
//! Provides the numeric building blocks of the crossbar pipeline:
//! - Symmetric quantization with per-quantity step tracking
//! - Activation range estimation with exponential smoothing
//! - Straight-through (identity) backward for quant-aware training
//! - Radix-`2^k` digit splitting of quantized levels for bit-serial execution

mod bit_split;
mod levels;
mod quantizer;
mod state;

pub use bit_split::{combine_digits, split_by_bit, split_level};
pub use levels::{
    check_bit_width, cycle, round_level, threshold, to_level, MAX_BITS, MAX_POINT_SHIFT,
};
pub use quantizer::{
    quantize, ste_backward, Phase, QuantMode, QuantizeConfig, Quantizer, RANGE_MOMENTUM,
    RANGE_SIGMA,
};
pub use state::{BitScale, BitScaleState, Quantity};
