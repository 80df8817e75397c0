//! # Memory Management
//!
//! Slot storage shared by the whole engine.
//!
//! ## Design Philosophy
//!
//! - Slots never move: growth appends, removal leaves a hole
//! - Stale access is detected (pool) or owner-checked (container users)
//! - Capacity doubles on demand; nothing is compacted behind the caller

mod container;
mod pool;

pub use container::Container;
pub use pool::{Handle, Pool};
