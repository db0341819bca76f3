//! Loading layer configs from YAML.

use std::fs;
use std::path::Path;

use super::schema::LayerConfig;
use super::validate::validate_layer_config;
use crate::error::{Result, XbarError};

impl LayerConfig {
    /// Parse and validate a YAML layer config.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: LayerConfig = serde_yaml::from_str(yaml)
            .map_err(|e| XbarError::ConfigParsing { message: e.to_string() })?;
        validate_layer_config(&config)?;
        Ok(config)
    }

    /// Read, parse and validate a YAML layer config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|source| XbarError::ConfigIo { path: path.to_path_buf(), source })?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| XbarError::ConfigParsing { message: e.to_string() })
    }

    /// Check every field; see [`validate_layer_config`].
    pub fn validate(&self) -> Result<()> {
        validate_layer_config(self)
    }
}
