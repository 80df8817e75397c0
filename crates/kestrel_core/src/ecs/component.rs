//! # Component System
//!
//! Components are plain data attached to entities. Each registered type gets
//! one [`ComponentStore`]: a dense [`Container`] of values plus a
//! [`Registry`] mapping entity ids to container slots.

use std::any::{type_name, TypeId};

use super::entity::{Entity, EntityId};
use super::registry::{AnyRegistry, Registry};
use crate::memory::Container;

/// Marker trait for ECS components.
///
/// # Example
///
/// ```rust
/// use kestrel_core::ecs::Component;
///
/// struct Health(f32);
/// impl Component for Health {}
/// ```
pub trait Component: 'static {}

/// Bit position of a registered component type in the 64-bit mask.
///
/// Equals the type's registration order. Stable for the life of the
/// process; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u8);

impl ComponentId {
    /// Highest number of component types a mask can describe.
    pub const MAX: usize = 64;

    /// Creates an id from a raw bit position.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 64 or more.
    #[inline]
    #[must_use]
    pub const fn new(index: u8) -> Self {
        assert!((index as usize) < Self::MAX, "component id out of range");
        Self(index)
    }

    /// Bit position in the component mask.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Single-bit mask for this id.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u64 {
        1 << self.0
    }
}

/// A tuple of component types, for building masks.
///
/// ```rust,ignore
/// let mask = components.mask::<(Transform, Mesh)>()?;
/// ```
pub trait ComponentSet {
    /// `TypeId` and name of every type in the set.
    fn types() -> Vec<(TypeId, &'static str)>;
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn types() -> Vec<(TypeId, &'static str)> {
                vec![$((TypeId::of::<$ty>(), type_name::<$ty>())),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

/// One occupied container slot: the value and the entity that owns it.
#[derive(Debug)]
struct Slot<T> {
    owner: Option<EntityId>,
    value: T,
}

/// Entity to component-value storage for one type.
///
/// Values are written with [`add`](Self::add) and bound to an entity with
/// [`add_entity`](Self::add_entity), or both at once with
/// [`insert`](Self::insert). Removal leaves a reusable hole.
///
/// The registry keeps stale mappings after removal; every lookup checks the
/// slot's owner so a recycled slot never resolves for the previous entity.
#[derive(Debug)]
pub struct ComponentStore<T> {
    values: Container<Slot<T>>,
    registry: AnyRegistry,
}

impl<T: Component> ComponentStore<T> {
    /// Creates an empty store over `registry`.
    #[must_use]
    pub fn new(registry: AnyRegistry) -> Self {
        Self::with_capacity(registry, 0)
    }

    /// Creates an empty store with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(registry: AnyRegistry, capacity: usize) -> Self {
        Self {
            values: Container::with_capacity(capacity),
            registry,
        }
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes a value into the container without binding it to an entity.
    ///
    /// Returns the slot index; the next [`add_entity`](Self::add_entity)
    /// binds it.
    pub fn add(&mut self, value: T) -> usize {
        self.values.insert(Slot { owner: None, value })
    }

    /// Binds the most recently written slot to `entity`.
    ///
    /// A slot the entity owned before is freed. Returns `false`, changing
    /// nothing, if there is no written slot to bind.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        let Some(index) = self.values.last_written() else {
            return false;
        };
        let previous = self.slot_of(entity.id);
        let Some(slot) = self.values.get_mut(index) else {
            return false;
        };
        slot.owner = Some(entity.id);
        if let Some(previous) = previous.filter(|&previous| previous != index) {
            self.values.remove(previous);
        }
        self.registry.add_item(entity.id, index);
        true
    }

    /// Stores `value` for `entity`, replacing the current value if any.
    ///
    /// Returns the replaced value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(current) = self.get_mut(entity.id) {
            return Some(std::mem::replace(current, value));
        }
        self.add(value);
        self.add_entity(entity);
        None
    }

    /// Gets the value owned by `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        let index = self.slot_of(id)?;
        self.values.get(index).map(|slot| &slot.value)
    }

    /// Gets the value owned by `id` mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let index = self.slot_of(id)?;
        self.values.get_mut(index).map(|slot| &mut slot.value)
    }

    /// Overwrites the value owned by `id`.
    ///
    /// Returns `false` if the entity has no value in this store.
    pub fn set(&mut self, id: EntityId, value: T) -> bool {
        match self.get_mut(id) {
            Some(current) => {
                *current = value;
                true
            }
            None => false,
        }
    }

    /// Frees the slot owned by `id`, leaving a reusable hole.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<T> {
        let index = self.slot_of(id)?;
        self.values.remove(index).map(|slot| slot.value)
    }

    /// Checks if `id` owns a value here.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slot_of(id).is_some()
    }

    /// Iterates over `(owner, value)` for every bound slot.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.values
            .iter()
            .filter_map(|(_, slot)| slot.owner.map(|owner| (owner, &slot.value)))
    }

    /// Backing registry.
    #[must_use]
    pub fn registry(&self) -> &AnyRegistry {
        &self.registry
    }

    /// Resolves `id` to its slot, rejecting mappings whose slot was freed or
    /// now belongs to another entity.
    fn slot_of(&self, id: EntityId) -> Option<usize> {
        let index = self.registry.get_index(id)?;
        let slot = self.values.get(index)?;
        (slot.owner == Some(id)).then_some(index)
    }
}
