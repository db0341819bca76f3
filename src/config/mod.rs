//! Declarative layer configuration
//!
//! A layer is described by three sections: quantization bit widths, crossbar
//! hardware parameters and the layer's mathematical shape. Configs load from
//! YAML and are validated before any layer is built.

mod load;
mod schema;
pub(crate) mod validate;

#[cfg(test)]
mod tests;

pub use schema::{HardwareConfig, LayerConfig, LayerShape, QuantizeBits};
pub use validate::validate_layer_config;
