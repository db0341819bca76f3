//! Fixed-point quantization with running-range estimation
//!
//! - Forward: scale estimate → round/clamp to symmetric levels → dequantize
//! - Side effect: the per-level step is committed into a [`BitScale`] row
//! - Backward: Straight-Through Estimator (STE) passes gradients unchanged
//!
//! [`BitScale`]: super::BitScale

mod config;
mod quantize;

#[cfg(test)]
mod tests;

pub use config::{Phase, QuantMode, QuantizeConfig};
pub use quantize::{quantize, ste_backward, Quantizer, RANGE_MOMENTUM, RANGE_SIGMA};
