//! Core configuration traits

use crate::QuorumError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Prefix for environment overrides, e.g. `QUORUM_DAO_MAX_ACTIONS`
pub const ENV_PREFIX: &str = "QUORUM_";

/// Core trait for Quorum configuration types
pub trait QuorumConfig: Clone + Default + DeserializeOwned + Send + Sync + 'static {
    /// Get default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file and validate it
    fn load_from_file(path: &Path) -> Result<Self, QuorumError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            QuorumError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text and validate it
    fn from_toml_str(content: &str) -> Result<Self, QuorumError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `QUORUM_<SECTION>_<KEY>` overrides from the process environment
    fn merge_with_env(&mut self) -> Result<(), QuorumError> {
        let overrides: Vec<(String, String)> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|rest| (rest.to_ascii_lowercase(), value))
            })
            .collect();
        for (key, value) in overrides {
            self.set_from_string(&key, &value)?;
        }
        Ok(())
    }

    /// Set one value from a `section_key` name and its string form
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), QuorumError>;

    /// Overlay every value of `other` that differs from the defaults
    fn merge_with(&mut self, other: &Self) -> Result<(), QuorumError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), QuorumError>;
}
