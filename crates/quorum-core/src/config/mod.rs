//! Framework configuration
//!
//! ```toml
//! [dao]
//! max_actions = 128
//!
//! [registry]
//! max_name_length = 64
//!
//! [processor]
//! max_batch_len = 512
//! ```

pub mod traits;
pub mod validation;

pub use traits::{QuorumConfig, ENV_PREFIX};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};

use crate::QuorumError;
use serde::{Deserialize, Serialize};

/// Hard ceiling on actions per execute call (bitmap width of the failure map)
pub const MAX_ACTIONS_CEILING: usize = 128;

/// DAO settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    /// Upper bound on actions per execute call
    pub max_actions: usize,
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            max_actions: MAX_ACTIONS_CEILING,
        }
    }
}

/// Plugin repo registry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Longest accepted plugin repo name
    pub max_name_length: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_name_length: 64,
        }
    }
}

/// Plugin setup processor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Largest permission batch a setup may produce
    pub max_batch_len: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self { max_batch_len: 512 }
    }
}

/// Configuration of a full framework deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// DAO settings
    pub dao: DaoConfig,
    /// Registry settings
    pub registry: RegistryConfig,
    /// Setup processor settings
    pub processor: ProcessorConfig,
}

fn parse_usize(key: &str, value: &str) -> Result<usize, QuorumError> {
    value
        .trim()
        .parse()
        .map_err(|_| QuorumError::config(format!("{key}: expected an integer, got '{value}'")))
}

impl QuorumConfig for FrameworkConfig {
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), QuorumError> {
        match key {
            "dao_max_actions" | "dao.max_actions" => {
                self.dao.max_actions = parse_usize(key, value)?;
            }
            "registry_max_name_length" | "registry.max_name_length" => {
                self.registry.max_name_length = parse_usize(key, value)?;
            }
            "processor_max_batch_len" | "processor.max_batch_len" => {
                self.processor.max_batch_len = parse_usize(key, value)?;
            }
            other => return Err(QuorumError::config(format!("unknown config key '{other}'"))),
        }
        Ok(())
    }

    fn merge_with(&mut self, other: &Self) -> Result<(), QuorumError> {
        let defaults = Self::default();
        if other.dao != defaults.dao {
            self.dao = other.dao.clone();
        }
        if other.registry != defaults.registry {
            self.registry = other.registry.clone();
        }
        if other.processor != defaults.processor {
            self.processor = other.processor.clone();
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), QuorumError> {
        let mut validator = ConfigValidator::new();
        let mut dao = validator.for_field("dao");
        dao.range(
            "max_actions",
            self.dao.max_actions as u64,
            Some(1),
            Some(MAX_ACTIONS_CEILING as u64),
        );
        validator.merge(dao);

        let mut registry = validator.for_field("registry");
        registry.range(
            "max_name_length",
            self.registry.max_name_length as u64,
            Some(1),
            None,
        );
        validator.merge(registry);

        let mut processor = validator.for_field("processor");
        processor.range(
            "max_batch_len",
            self.processor.max_batch_len as u64,
            Some(1),
            None,
        );
        validator.merge(processor);

        validator.result().map_err(QuorumError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = FrameworkConfig::defaults();
        assert!(config.validate().is_ok());
        assert_eq!(config.dao.max_actions, MAX_ACTIONS_CEILING);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FrameworkConfig::from_toml_str("[registry]\nmax_name_length = 32\n").unwrap();
        assert_eq!(config.registry.max_name_length, 32);
        assert_eq!(config.processor, ProcessorConfig::default());
    }

    #[test]
    fn test_zero_bound_is_rejected() {
        let err = FrameworkConfig::from_toml_str("[processor]\nmax_batch_len = 0\n").unwrap_err();
        assert!(err.to_string().contains("processor.max_batch_len"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dao]\nmax_actions = 16").unwrap();
        let config = FrameworkConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.dao.max_actions, 16);
    }

    #[test]
    fn test_set_from_string_and_merge() {
        let mut config = FrameworkConfig::default();
        config.set_from_string("dao_max_actions", "8").unwrap();
        assert_eq!(config.dao.max_actions, 8);
        assert!(config.set_from_string("dao_max_actions", "many").is_err());
        assert!(config.set_from_string("nope", "1").is_err());

        let mut base = FrameworkConfig::default();
        base.merge_with(&config).unwrap();
        assert_eq!(base.dao.max_actions, 8);
    }
}
