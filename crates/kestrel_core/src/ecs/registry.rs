//! # Entity Registries
//!
//! Map an entity id to the storage slot holding its component value.
//!
//! Two interchangeable backings:
//! - [`DenseRegistry`] - a radix trie keyed by id; memory follows live ids
//! - [`SparseRegistry`] - a flat array indexed by id; O(1), memory follows
//!   the largest id
//!
//! Neither backing clears mappings when a component is removed. The store
//! owning the slots is responsible for rejecting stale ones.

use serde::Deserialize;

use super::entity::EntityId;
use crate::index::RadixTrie;

/// Entity id to slot index map.
pub trait Registry {
    /// Binds `id` to `slot`, replacing any previous binding.
    fn add_item(&mut self, id: EntityId, slot: usize);

    /// Returns the slot bound to `id`.
    fn get_index(&self, id: EntityId) -> Option<usize>;

    /// Drops every binding.
    fn clear(&mut self);
}

/// Which registry backs a component store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBacking {
    /// Radix trie keyed by entity id.
    Dense,
    /// Growable array indexed by entity id.
    #[default]
    Sparse,
}

/// Trie-backed registry.
#[derive(Debug, Default)]
pub struct DenseRegistry {
    slots: RadixTrie<u32, usize>,
}

impl DenseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for DenseRegistry {
    fn add_item(&mut self, id: EntityId, slot: usize) {
        // One slot per id: replace whatever the bucket holds.
        self.slots.upsert(id, slot, |_| true);
    }

    fn get_index(&self, id: EntityId) -> Option<usize> {
        self.slots.get(id)?.first().copied()
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Array-backed registry.
///
/// Grows by doubling when an id lands past the end, up to
/// [`SparseRegistry::MAX_IDS`] ids (4 bytes each). Worlds with larger ids
/// should use the dense backing.
#[derive(Debug)]
pub struct SparseRegistry {
    /// Slot per id; [`SparseRegistry::ABSENT`] marks no binding.
    slots: Vec<u32>,
}

impl SparseRegistry {
    /// Sentinel for "no slot".
    pub const ABSENT: u32 = u32::MAX;

    /// Highest number of ids the array may grow to cover (1 GiB of slots).
    pub const MAX_IDS: usize = 1 << 28;

    /// Creates a registry with room for ids below `capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Self::ABSENT; capacity.max(1)],
        }
    }

    /// Number of ids addressable without growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for SparseRegistry {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Registry for SparseRegistry {
    /// # Panics
    ///
    /// Panics if `slot` does not fit below the `u32::MAX` sentinel, or if
    /// `id` is at or beyond [`SparseRegistry::MAX_IDS`].
    fn add_item(&mut self, id: EntityId, slot: usize) {
        let slot = match u32::try_from(slot) {
            Ok(slot) if slot != Self::ABSENT => slot,
            _ => panic!("slot {slot} does not fit a sparse registry entry"),
        };

        let index = id as usize;
        assert!(
            index < Self::MAX_IDS,
            "entity id {id} exceeds the sparse registry limit of {} ids; use the dense backing",
            Self::MAX_IDS
        );
        if index >= self.slots.len() {
            let mut grown = self.slots.len();
            while grown <= index {
                grown *= 2;
            }
            let grown = grown.min(Self::MAX_IDS);
            tracing::trace!(from = self.slots.len(), to = grown, "growing sparse registry");
            self.slots.resize(grown, Self::ABSENT);
        }
        self.slots[index] = slot;
    }

    fn get_index(&self, id: EntityId) -> Option<usize> {
        match self.slots.get(id as usize).copied() {
            None | Some(Self::ABSENT) => None,
            Some(slot) => Some(slot as usize),
        }
    }

    fn clear(&mut self) {
        self.slots.fill(Self::ABSENT);
    }
}

/// A registry of either backing, chosen at runtime.
#[derive(Debug)]
pub enum AnyRegistry {
    /// Trie-backed.
    Dense(DenseRegistry),
    /// Array-backed.
    Sparse(SparseRegistry),
}

impl AnyRegistry {
    /// Builds an empty registry of the requested backing.
    ///
    /// `sparse_capacity` is ignored by the dense backing.
    #[must_use]
    pub fn new(backing: RegistryBacking, sparse_capacity: usize) -> Self {
        match backing {
            RegistryBacking::Dense => Self::Dense(DenseRegistry::new()),
            RegistryBacking::Sparse => Self::Sparse(SparseRegistry::new(sparse_capacity)),
        }
    }

    /// Which backing this is.
    #[must_use]
    pub const fn backing(&self) -> RegistryBacking {
        match self {
            Self::Dense(_) => RegistryBacking::Dense,
            Self::Sparse(_) => RegistryBacking::Sparse,
        }
    }
}

impl Registry for AnyRegistry {
    fn add_item(&mut self, id: EntityId, slot: usize) {
        match self {
            Self::Dense(registry) => registry.add_item(id, slot),
            Self::Sparse(registry) => registry.add_item(id, slot),
        }
    }

    fn get_index(&self, id: EntityId) -> Option<usize> {
        match self {
            Self::Dense(registry) => registry.get_index(id),
            Self::Sparse(registry) => registry.get_index(id),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Dense(registry) => registry.clear(),
            Self::Sparse(registry) => registry.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(registry: &mut impl Registry) {
        assert_eq!(registry.get_index(7), None);

        registry.add_item(7, 3);
        registry.add_item(1000, 4);
        assert_eq!(registry.get_index(7), Some(3));
        assert_eq!(registry.get_index(1000), Some(4));

        // Rebinding replaces.
        registry.add_item(7, 9);
        assert_eq!(registry.get_index(7), Some(9));

        registry.clear();
        assert_eq!(registry.get_index(7), None);
    }

    #[test]
    fn test_dense_registry() {
        exercise(&mut DenseRegistry::new());
    }

    #[test]
    fn test_sparse_registry() {
        exercise(&mut SparseRegistry::new(4));
    }

    #[test]
    fn test_any_registry_dispatch() {
        exercise(&mut AnyRegistry::new(RegistryBacking::Dense, 0));
        exercise(&mut AnyRegistry::new(RegistryBacking::Sparse, 2));
    }

    #[test]
    fn test_sparse_doubles_on_overflow() {
        let mut registry = SparseRegistry::new(4);
        registry.add_item(4, 0);
        assert_eq!(registry.capacity(), 8);

        registry.add_item(20, 1);
        assert_eq!(registry.capacity(), 32);
        assert_eq!(registry.get_index(4), Some(0));
    }

    #[test]
    #[should_panic(expected = "sparse registry limit")]
    fn test_sparse_rejects_ids_past_the_limit() {
        let mut registry = SparseRegistry::new(4);
        let id = EntityId::try_from(SparseRegistry::MAX_IDS).unwrap();
        registry.add_item(id, 0);
    }

    #[test]
    fn test_slot_zero_is_a_real_binding() {
        let mut registry = SparseRegistry::new(1);
        registry.add_item(0, 0);
        assert_eq!(registry.get_index(0), Some(0));
    }
}
