//! Error types with actionable diagnostics.
//!
//! Failures are synchronous and never retried inside the crate; they all
//! surface to the caller through [`XbarError`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crossbar simulation operations.
pub type Result<T> = std::result::Result<T, XbarError>;

/// Errors raised while configuring or evaluating a crossbar layer.
#[derive(Error, Debug)]
pub enum XbarError {
    /// Configuration value is out of range.
    #[error("Invalid configuration value for '{field}': {message}\n  → {suggestion}")]
    ConfigValue { field: String, message: String, suggestion: String },

    /// Configuration file could not be read.
    #[error("Failed to read configuration {path}\n  Cause: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid YAML for a layer config.
    #[error("Invalid configuration syntax: {message}\n  → Check the quantize/hardware/layer sections")]
    ConfigParsing { message: String },

    /// A mode, quantize-mode or phase string is not recognised.
    #[error("Unknown {kind} '{value}'\n  → Expected one of: {expected}")]
    UnknownVariant { kind: &'static str, value: String, expected: &'static str },

    /// Partition dimension is zero.
    #[error("Cannot partition an empty input dimension\n  → in_channels/in_features must be > 0")]
    EmptyDimension,

    /// Crossbar rows cannot hold a single input element.
    #[error("Crossbar row capacity {xbar_row} holds no element of cost {row_cost}\n  → Increase xbar_row or reduce kernel_size")]
    ZeroRowCapacity { xbar_row: usize, row_cost: usize },

    /// Tensor shape does not match what the layer expects.
    #[error("Tensor shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { context: &'static str, expected: Vec<usize>, actual: Vec<usize> },

    /// The layer's training flag forbids the requested operation.
    #[error("{operation} is not allowed while {state}\n  → Call {hint}() on the layer first")]
    TrainingState { operation: &'static str, state: &'static str, hint: &'static str },

    /// Hardware-accurate inference was called without the previous layer's range.
    #[error("Hardware-accurate inference requires the input bit width and step\n  → Pass the previous layer's output_bit_scale()")]
    MissingInputScale,

    /// A scale the pipeline depends on has not been committed yet.
    #[error("The {quantity} step has not been calibrated\n  → Run a quant-aware forward pass before hardware-accurate inference")]
    Uncalibrated { quantity: &'static str },

    /// Backward was requested without a cached quant-aware training forward.
    #[error("No quant-aware training forward to differentiate\n  → Run forward with QuantAwareTrain in training mode first")]
    NoForwardCache,
}

impl XbarError {
    /// Shorthand for an out-of-range configuration value.
    pub fn config_value(
        field: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::ConfigValue {
            field: field.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Check if this error stems from the configuration rather than the call.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigValue { .. }
                | Self::ConfigIo { .. }
                | Self::ConfigParsing { .. }
                | Self::UnknownVariant { .. }
                | Self::EmptyDimension
                | Self::ZeroRowCapacity { .. }
        )
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigValue { .. } => "X001",
            Self::ConfigIo { .. } => "X002",
            Self::ConfigParsing { .. } => "X003",
            Self::UnknownVariant { .. } => "X004",
            Self::EmptyDimension => "X010",
            Self::ZeroRowCapacity { .. } => "X011",
            Self::ShapeMismatch { .. } => "X020",
            Self::TrainingState { .. } => "X030",
            Self::MissingInputScale => "X031",
            Self::Uncalibrated { .. } => "X032",
            Self::NoForwardCache => "X033",
        }
    }
}
