//! # Render Configuration
//!
//! ```toml
//! initial_resource_capacity = 256
//! initial_batch_capacity = 64
//! render_mask = 7
//! ```

use std::path::Path;

use kestrel_core::ConfigError;
use serde::Deserialize;

/// Tuning knobs for the render layer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Slots reserved up front in each resource pool.
    pub initial_resource_capacity: usize,
    /// Instances reserved up front in each new draw batch.
    pub initial_batch_capacity: usize,
    /// Component mask a drawable entity must have. `None` means
    /// Transform + `MeshRef` + `MaterialRef`.
    pub render_mask: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            initial_resource_capacity: 64,
            initial_batch_capacity: 16,
            render_mask: None,
        }
    }
}

impl RenderConfig {
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
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_mask == Some(0) {
            return Err(ConfigError::Invalid(
                "render_mask must select at least one component".to_owned(),
            ));
        }
        Ok(())
    }
}
