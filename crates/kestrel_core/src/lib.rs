//! # Kestrel Core
//!
//! Entity/component storage and query engine:
//! - a generational-handle object pool for typed resources
//! - a 16-ary radix trie indexing payloads by bitmask key, answering
//!   has-all / has-any / has-exactly / excludes queries without a scan
//! - an ECS built on both, with frame-buffered structural changes
//!
//! ## Example
//!
//! ```rust
//! use kestrel_core::{Component, MaskQuery, World};
//!
//! struct Position(f32, f32);
//! impl Component for Position {}
//! struct Velocity(f32, f32);
//! impl Component for Velocity {}
//!
//! let mut world = World::new();
//! world.register_component::<Position>().unwrap();
//! world.register_component::<Velocity>().unwrap();
//!
//! let id = world.create_entity();
//! world.add_component(id, Position(0.0, 0.0)).unwrap();
//! world.add_component(id, Velocity(1.0, 0.0)).unwrap();
//! world.commit_entities();
//!
//! let moving = world.mask::<(Position, Velocity)>().unwrap();
//! assert_eq!(world.get_entities(&MaskQuery::new().with_all(moving)).len(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod index;
pub mod memory;

pub use config::CoreConfig;
pub use ecs::{
    Component, ComponentId, ComponentManager, ComponentStore, Engine, Entity, EntityId,
    EntityManager, FrameReport, RegistryBacking, System, SystemManager, World,
};
pub use error::{ComponentError, ConfigError, CoreError, CoreResult, PoolError};
pub use index::{MaskKey, MaskQuery, RadixTrie};
pub use memory::{Container, Handle, Pool};
