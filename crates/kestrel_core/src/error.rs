//! # Core Error Types
//!
//! All errors that can occur in the storage and query engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors from handle lookups in a [`Pool`](crate::memory::Pool).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Handle index is beyond the pool's declared capacity.
    #[error("handle index {index} out of bounds for pool capacity {capacity}")]
    OutOfBounds {
        /// The offending index.
        index: u32,
        /// Capacity at the time of the lookup.
        capacity: usize,
    },

    /// Slot was recycled (or never filled) since the handle was issued.
    #[error("stale handle: slot {index} has generation {current}, handle has {generation}")]
    Stale {
        /// Slot index.
        index: u32,
        /// Generation carried by the handle.
        generation: u32,
        /// Generation currently stored in the slot.
        current: u32,
    },
}

/// Errors from the component manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// The component type was never registered.
    #[error("component type `{0}` is not registered")]
    Unregistered(&'static str),

    /// All 64 mask bits are taken.
    #[error("cannot register `{0}`: all 64 component bits are taken")]
    TooManyComponents(&'static str),

    /// The store at a bit position holds a different type.
    #[error("component store {id} does not hold `{expected}`")]
    TypeMismatch {
        /// Bit position of the store.
        id: u8,
        /// Type the caller asked for.
        expected: &'static str,
    },
}

/// Errors while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the expected schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Umbrella error for facade operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Pool lookup failed.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Component registration or lookup failed.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// Configuration failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The entity was never created or has already been committed as removed.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

/// Result type for facade operations.
pub type CoreResult<T> = Result<T, CoreError>;
