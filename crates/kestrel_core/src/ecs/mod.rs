//! # Entity Component System
//!
//! Entities are an id plus a 64-bit component mask. Live entities are
//! indexed by that mask in a [`RadixTrie`](crate::index::RadixTrie), so set
//! queries over component types walk only the branches that can match.
//!
//! ## Design
//!
//! - One [`ComponentStore`] per registered type, behind a dispatch table
//!   indexed by [`ComponentId`] (the type's bit position)
//! - Entity adds and removes are buffered and committed once per frame, so
//!   queries issued by systems see a stable snapshot
//! - Destroyed entities' values are freed at the end of the frame
//! - Single-threaded; systems run strictly in sequence

mod component;
mod dirty;
mod entity;
mod manager;
mod registry;
mod system;
mod world;

pub use component::{Component, ComponentId, ComponentSet, ComponentStore};
pub use dirty::{DirtyIter, DirtyTracker};
pub use entity::{Entity, EntityId, EntityManager, FlushStats};
pub use manager::{ComponentManager, ErasedStore};
pub use registry::{AnyRegistry, DenseRegistry, Registry, RegistryBacking, SparseRegistry};
pub use system::{System, SystemManager};
pub use world::{Engine, FrameReport, World};
