//! Bit splitting for bit-serial crossbar execution
//!
//! A quantized level `q` with `|q| <= threshold(bit_width)` is written as
//! `sign(q) · Σ digit_i · 2^(bit_split·i)` with every `digit_i < 2^bit_split`,
//! least significant digit first. Weights split by the cell resolution,
//! activations by the DAC resolution.

mod split;


pub use split::{combine_digits, split_by_bit, split_level};
