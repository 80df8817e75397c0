//! # Core Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid config.
//!
//! ```toml
//! initial_store_capacity = 256
//! registry_backing = "dense"
//! sparse_registry_capacity = 4096
//! dirty_tracking = true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::ecs::RegistryBacking;
use crate::error::ConfigError;

/// Tuning knobs for the storage engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Slots reserved up front in every component store.
    pub initial_store_capacity: usize,
    /// Registry backing for newly registered component types.
    pub registry_backing: RegistryBacking,
    /// Initial id range of sparse registries.
    pub sparse_registry_capacity: usize,
    /// Enable dirty tracking on every newly registered component type.
    pub dirty_tracking: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            initial_store_capacity: 64,
            registry_backing: RegistryBacking::Sparse,
            sparse_registry_capacity: 1024,
            dirty_tracking: false,
        }
    }
}

impl CoreConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys,
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded core config");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sparse_registry_capacity == 0 {
            return Err(ConfigError::Invalid(
                "sparse_registry_capacity must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(CoreConfig::from_toml_str("").ok(), Some(CoreConfig::default()));
    }

    #[test]
    fn test_parse_all_fields() {
        let config = CoreConfig::from_toml_str(
            r#"
            initial_store_capacity = 8
            registry_backing = "dense"
            sparse_registry_capacity = 16
            dirty_tracking = true
            "#,
        )
        .unwrap();

        assert_eq!(config.initial_store_capacity, 8);
        assert_eq!(config.registry_backing, RegistryBacking::Dense);
        assert_eq!(config.sparse_registry_capacity, 16);
        assert!(config.dirty_tracking);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = CoreConfig::from_toml_str("pool_size = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_sparse_capacity_rejected() {
        let result = CoreConfig::from_toml_str("sparse_registry_capacity = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = CoreConfig::load("/definitely/not/here/kestrel.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
