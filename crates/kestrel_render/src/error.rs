//! # Render Error Types

use kestrel_core::{ConfigError, CoreError, EntityId, PoolError};
use thiserror::Error;

/// Errors from the render layer.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A resource handle no longer resolves.
    #[error("{kind} handle is not valid: {source}")]
    StaleResource {
        /// Resource kind (`"buffer"`, `"texture"`, `"pipeline"`).
        kind: &'static str,
        /// Pool lookup failure.
        #[source]
        source: PoolError,
    },

    /// A drawable entity lacks one of the render components.
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        /// The entity.
        entity: EntityId,
        /// Missing component type.
        component: &'static str,
    },

    /// Render configuration failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The core engine reported an error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
