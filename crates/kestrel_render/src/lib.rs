//! # Kestrel Render
//!
//! The render-side consumer of `kestrel_core`:
//! - [`RenderSystem`] queries drawable entities once per frame and folds
//!   them into draw batches
//! - [`BatchIndex`] keys batches by [`MaterialFlags`] in a 32-bit radix trie
//! - [`GpuResources`] tracks buffer, texture and pipeline lifetimes on
//!   generational pools, so stale references are detected, not drawn
//!
//! ## Architecture
//!
//! ```text
//! World ──get_entities(Transform|MeshRef|MaterialRef)──> RenderSystem
//!                                                            │
//!                        GpuResources (handle checks) <──────┤
//!                                                            ▼
//!                             BatchIndex (MaterialFlags trie) ──> backend
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod batch;
pub mod components;
pub mod config;
pub mod error;
pub mod material;
pub mod resources;
pub mod system;

pub use batch::{BatchIndex, DrawBatch, InstanceData};
pub use components::{Hidden, MaterialRef, MeshRef, Transform};
pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use material::MaterialFlags;
pub use resources::{
    BufferDesc, BufferUsage, GpuResources, PipelineDesc, ResourceCounts, TextureDesc, TextureFormat,
};
pub use system::{FrameStats, RenderSystem};
