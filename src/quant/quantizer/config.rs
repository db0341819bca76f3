//! Quantization mode and phase selection.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, XbarError};

/// What kind of tensor is being quantized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantMode {
    /// Scale from the tensor's absolute maximum
    Weight,
    /// Scale from the running activation range
    Activation,
}

/// Whether the activation range may still move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Blend the committed range with a data estimate
    Train,
    /// Reuse the committed range
    Test,
}

impl Phase {
    /// Phase matching a layer's training flag.
    pub fn from_training(training: bool) -> Self {
        if training {
            Phase::Train
        } else {
            Phase::Test
        }
    }
}

impl FromStr for QuantMode {
    type Err = XbarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weight" => Ok(QuantMode::Weight),
            "activation" => Ok(QuantMode::Activation),
            other => Err(XbarError::UnknownVariant {
                kind: "quantize mode",
                value: other.to_string(),
                expected: "weight, activation",
            }),
        }
    }
}

impl FromStr for Phase {
    type Err = XbarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Phase::Train),
            "test" => Ok(Phase::Test),
            other => Err(XbarError::UnknownVariant {
                kind: "phase",
                value: other.to_string(),
                expected: "train, test",
            }),
        }
    }
}

impl fmt::Display for QuantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantMode::Weight => f.write_str("weight"),
            QuantMode::Activation => f.write_str("activation"),
        }
    }
}

/// One quantization request: mode, phase (activations only) and target bits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizeConfig {
    /// Weight or activation scaling
    pub mode: QuantMode,
    /// Required when `mode` is [`QuantMode::Activation`]
    pub phase: Option<Phase>,
    /// Target bit width
    pub bits: u32,
}

impl QuantizeConfig {
    /// Weight quantization at `bits`.
    pub fn weight(bits: u32) -> Self {
        Self { mode: QuantMode::Weight, phase: None, bits }
    }

    /// Activation quantization at `bits` in the given phase.
    pub fn activation(bits: u32, phase: Phase) -> Self {
        Self { mode: QuantMode::Activation, phase: Some(phase), bits }
    }
}
