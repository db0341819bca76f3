//! Forward evaluation modes.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, XbarError};

/// How a forward call evaluates the layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ForwardMode {
    /// Unquantized reference path
    FullPrecision,
    /// Fake-quantized weights and outputs, differentiable through STE
    QuantAwareTrain,
    /// Bit-serial crossbar simulation; evaluation only
    #[default]
    HwAccurateInfer,
}

impl FromStr for ForwardMode {
    type Err = XbarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full_precision" | "TRADITION" => Ok(ForwardMode::FullPrecision),
            "quant_aware_train" | "FIX_TRAIN" => Ok(ForwardMode::QuantAwareTrain),
            "hw_accurate_infer" | "SINGLE_FIX_TEST" => Ok(ForwardMode::HwAccurateInfer),
            other => Err(XbarError::UnknownVariant {
                kind: "forward mode",
                value: other.to_string(),
                expected: "full_precision, quant_aware_train, hw_accurate_infer",
            }),
        }
    }
}

impl fmt::Display for ForwardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForwardMode::FullPrecision => "full_precision",
            ForwardMode::QuantAwareTrain => "quant_aware_train",
            ForwardMode::HwAccurateInfer => "hw_accurate_infer",
        };
        f.write_str(name)
    }
}
