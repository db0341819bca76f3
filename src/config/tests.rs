//! Tests for layer configuration loading and validation.

use super::*;
use crate::error::XbarError;
use proptest::prelude::*;
use std::io::Write;

const CONV_YAML: &str = r#"
quantize:
  input: 9
  weight: 9
  output: 9
hardware:
  xbar_row: 256
  cell_bit: 2
  dac_bit: 1
  adc_bit: 10
  point_shift: -2
layer:
  type: conv
  in_channels: 64
  out_channels: 128
  kernel_size: 3
  padding: 1
"#;

const FC_YAML: &str = r#"
quantize: { input: 8, weight: 8, output: 8, momentum: 0.5 }
hardware: { xbar_row: 128, cell_bit: 1, dac_bit: 1, adc_bit: 8 }
layer: { type: fc, in_features: 300, out_features: 10 }
"#;

fn fc_config() -> LayerConfig {
    LayerConfig {
        quantize: QuantizeBits::new(8, 8, 8),
        hardware: HardwareConfig::default(),
        layer: LayerShape::Fc { in_features: 16, out_features: 4 },
    }
}

#[test]
fn test_parse_conv_with_defaults() {
    let config = LayerConfig::from_yaml_str(CONV_YAML).unwrap();
    assert_eq!(config.layer.name(), "conv");
    assert_eq!(
        config.layer,
        LayerShape::Conv { in_channels: 64, out_channels: 128, kernel_size: 3, stride: 1, padding: 1 }
    );
    assert_eq!(config.layer.row_cost(), 9);
    assert_eq!(config.hardware.point_shift, -2);
    assert_eq!(config.quantize.momentum, 0.707);
    assert_eq!(config.quantize.sigma, 3.0);
}

#[test]
fn test_parse_fc_flow_style() {
    let config = LayerConfig::from_yaml_str(FC_YAML).unwrap();
    assert_eq!(config.layer.name(), "fc");
    assert_eq!(config.layer.in_dim(), 300);
    assert_eq!(config.hardware.point_shift, 0);
    assert_eq!(config.quantize.momentum, 0.5);
}

#[test]
fn test_unknown_layer_type_is_parse_error() {
    let yaml = FC_YAML.replace("type: fc", "type: pool");
    let err = LayerConfig::from_yaml_str(&yaml).unwrap_err();
    assert!(matches!(err, XbarError::ConfigParsing { .. }));
}

#[test]
fn test_missing_section_is_parse_error() {
    let err = LayerConfig::from_yaml_str("quantize: { input: 8, weight: 8, output: 8 }").unwrap_err();
    assert!(matches!(err, XbarError::ConfigParsing { .. }));
}

#[test]
fn test_yaml_round_trip() {
    let config = LayerConfig::from_yaml_str(CONV_YAML).unwrap();
    let yaml = config.to_yaml().unwrap();
    assert_eq!(LayerConfig::from_yaml_str(&yaml).unwrap(), config);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONV_YAML.as_bytes()).unwrap();
    let config = LayerConfig::load(file.path()).unwrap();
    assert_eq!(config.layer.in_dim(), 64);
}

#[test]
fn test_load_missing_file() {
    let err = LayerConfig::load("/nonexistent/layer.yaml").unwrap_err();
    assert!(matches!(err, XbarError::ConfigIo { .. }));
    assert!(err.is_config_error());
}

#[test]
fn test_validate_rejects_zero_in_dim() {
    let mut config = fc_config();
    config.layer = LayerShape::Fc { in_features: 0, out_features: 4 };
    assert!(matches!(config.validate(), Err(XbarError::EmptyDimension)));
}

#[test]
fn test_validate_rejects_kernel_larger_than_crossbar() {
    let mut config = fc_config();
    config.hardware.xbar_row = 8;
    config.layer =
        LayerShape::Conv { in_channels: 4, out_channels: 4, kernel_size: 3, stride: 1, padding: 0 };
    assert!(matches!(config.validate(), Err(XbarError::ZeroRowCapacity { .. })));
}

#[test]
fn test_validate_rejects_bad_hardware() {
    let mut config = fc_config();
    config.hardware.xbar_row = 0;
    assert!(config.validate().is_err());

    let mut config = fc_config();
    config.hardware.cell_bit = 0;
    assert!(config.validate().is_err());

    let mut config = fc_config();
    config.hardware.adc_bit = 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_heuristics() {
    let mut config = fc_config();
    config.quantize.momentum = 1.0;
    assert!(config.validate().is_err());

    let mut config = fc_config();
    config.quantize.sigma = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_stride() {
    let mut config = fc_config();
    config.layer =
        LayerShape::Conv { in_channels: 4, out_channels: 4, kernel_size: 3, stride: 0, padding: 0 };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("stride"));
}

#[test]
fn test_validate_bounds_point_shift() {
    let mut config = fc_config();
    for shift in [-crate::quant::MAX_POINT_SHIFT, -2, 0, crate::quant::MAX_POINT_SHIFT] {
        config.hardware.point_shift = shift;
        assert!(config.validate().is_ok(), "point_shift {shift} should be accepted");
    }
    for shift in [i32::MAX, i32::MIN, crate::quant::MAX_POINT_SHIFT + 1] {
        config.hardware.point_shift = shift;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("point_shift"), "{err}");
    }
}

#[test]
fn test_huge_point_shift_yaml_is_rejected_at_load() {
    let yaml = FC_YAML.replace("adc_bit: 8 }", "adc_bit: 8, point_shift: 2147483647 }");
    let err = LayerConfig::from_yaml_str(&yaml).unwrap_err();
    assert!(matches!(err, XbarError::ConfigValue { .. }));
}

#[test]
fn test_overflowing_kernel_has_no_row_capacity() {
    let mut config = fc_config();
    let kernel_size = usize::MAX / 2;
    config.layer = LayerShape::Conv { in_channels: 4, out_channels: 4, kernel_size, stride: 1, padding: 0 };
    assert_eq!(config.layer.row_cost(), usize::MAX);
    assert!(matches!(config.validate(), Err(XbarError::ZeroRowCapacity { .. })));
}

proptest! {
    #[test]
    fn prop_bit_widths_validated(bits in 0u32..40) {
        let mut config = fc_config();
        config.quantize.weight = bits;
        let ok = config.validate().is_ok();
        prop_assert_eq!(ok, (2..=crate::quant::MAX_BITS).contains(&bits));
    }
}
