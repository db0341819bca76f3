//! Crossbar layer orchestration
//!
//! One [`CrossbarLayer`] owns the partitioned weights and the
//! `(bit_width, step)` table, and evaluates the layer in one of three modes:
//! - Full precision: plain partitioned primitive, summed
//! - Quant-aware training: quantized weights and outputs, STE backward
//! - Hardware-accurate inference: bit-serial digits with ADC readout per partial sum

mod crossbar;
mod mode;


pub use crossbar::{CrossbarLayer, QatGradients};
pub use mode::ForwardMode;
