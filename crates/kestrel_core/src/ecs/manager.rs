//! # Component Manager
//!
//! Owns one [`ComponentStore`] per registered component type.
//!
//! Stores live in a dispatch table indexed by [`ComponentId`], which is the
//! type's registration order and its bit position in entity masks. The
//! table is type-erased behind [`ErasedStore`]; typed access goes through a
//! checked `Any` downcast of the slot the id points at.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentId, ComponentSet, ComponentStore};
use super::dirty::DirtyTracker;
use super::entity::{Entity, EntityId};
use super::registry::{AnyRegistry, RegistryBacking};
use crate::config::CoreConfig;
use crate::error::ComponentError;

/// Type-independent operations on a component store.
pub trait ErasedStore {
    /// Frees the entity's value. Returns `true` if one was held.
    fn erase_entity(&mut self, id: EntityId) -> bool;

    /// Checks if the entity holds a value.
    fn holds(&self, id: EntityId) -> bool;

    /// Number of stored values.
    fn value_count(&self) -> usize;

    /// Name of the stored component type.
    fn type_name(&self) -> &'static str;

    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` for mutable downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn erase_entity(&mut self, id: EntityId) -> bool {
        self.remove_entity(id).is_some()
    }

    fn holds(&self, id: EntityId) -> bool {
        self.contains(id)
    }

    fn value_count(&self) -> usize {
        self.len()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One dispatch table slot.
struct StoreEntry {
    store: Box<dyn ErasedStore>,
    dirty: Option<DirtyTracker>,
}

/// Heterogeneous component storage with stable bit positions.
pub struct ComponentManager {
    /// Dispatch table; position = [`ComponentId`].
    entries: Vec<StoreEntry>,
    ids: HashMap<TypeId, ComponentId>,
    /// Destroyed entities whose values are freed at the next `update`.
    unregister_queue: Vec<Entity>,
    /// Position of each queued id in `unregister_queue`.
    queued: HashMap<EntityId, usize>,
    config: CoreConfig,
}

impl ComponentManager {
    /// Creates an empty manager with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    /// Creates an empty manager; new stores follow `config`.
    #[must_use]
    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            entries: Vec::new(),
            ids: HashMap::new(),
            unregister_queue: Vec::new(),
            queued: HashMap::new(),
            config,
        }
    }

    /// Registers `T` with the configured registry backing.
    ///
    /// Idempotent: a registered type keeps its id.
    ///
    /// # Errors
    ///
    /// [`ComponentError::TooManyComponents`] once 64 types are registered.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, ComponentError> {
        self.register_with::<T>(self.config.registry_backing)
    }

    /// Registers `T` with an explicit registry backing.
    ///
    /// The backing of an already registered type is left unchanged.
    ///
    /// # Errors
    ///
    /// [`ComponentError::TooManyComponents`] once 64 types are registered.
    pub fn register_with<T: Component>(
        &mut self,
        backing: RegistryBacking,
    ) -> Result<ComponentId, ComponentError> {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        let index = u8::try_from(self.entries.len())
            .ok()
            .filter(|&index| usize::from(index) < ComponentId::MAX)
            .ok_or(ComponentError::TooManyComponents(type_name::<T>()))?;
        let id = ComponentId::new(index);

        let registry = AnyRegistry::new(backing, self.config.sparse_registry_capacity);
        let store = ComponentStore::<T>::with_capacity(registry, self.config.initial_store_capacity);
        self.entries.push(StoreEntry {
            store: Box::new(store),
            dirty: self.config.dirty_tracking.then(DirtyTracker::default),
        });
        self.ids.insert(TypeId::of::<T>(), id);

        tracing::debug!(
            component = type_name::<T>(),
            bit = id.index(),
            ?backing,
            "registered component type"
        );
        Ok(id)
    }

    /// Id of a registered type.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn id<T: Component>(&self) -> Result<ComponentId, ComponentError> {
        self.ids
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(ComponentError::Unregistered(type_name::<T>()))
    }

    /// Single-bit mask of a registered type.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn bit<T: Component>(&self) -> Result<u64, ComponentError> {
        self.id::<T>().map(ComponentId::bit)
    }

    /// ORs the bits of every type in `S`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] naming the first unknown type.
    pub fn mask<S: ComponentSet>(&self) -> Result<u64, ComponentError> {
        S::types().into_iter().try_fold(0, |mask, (type_id, name)| {
            let id = self
                .ids
                .get(&type_id)
                .ok_or(ComponentError::Unregistered(name))?;
            Ok(mask | id.bit())
        })
    }

    /// Typed store of `T`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn store<T: Component>(&self) -> Result<&ComponentStore<T>, ComponentError> {
        let id = self.id::<T>()?;
        self.entries[id.index()]
            .store
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .ok_or(ComponentError::TypeMismatch {
                id: id.get(),
                expected: type_name::<T>(),
            })
    }

    /// Typed store of `T`, mutably.
    ///
    /// Writes through this reference are not dirty-tracked.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn store_mut<T: Component>(&mut self) -> Result<&mut ComponentStore<T>, ComponentError> {
        self.entry_mut::<T>().map(|(store, _)| store)
    }

    /// Value of `T` owned by `id`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn get<T: Component>(&self, id: EntityId) -> Result<Option<&T>, ComponentError> {
        Ok(self.store::<T>()?.get(id))
    }

    /// Value of `T` owned by `id`, mutably. Marks it dirty when `T` is
    /// tracked.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Result<Option<&mut T>, ComponentError> {
        let (store, dirty) = self.entry_mut::<T>()?;
        let value = store.get_mut(id);
        if value.is_some() {
            if let Some(tracker) = dirty {
                tracker.mark_dirty(id as usize);
            }
        }
        Ok(value)
    }

    /// Stores `value` for `entity`, returning the replaced value.
    ///
    /// Marks the entity dirty when `T` is tracked. Does not touch the
    /// entity's mask; see [`World::add_component`](super::World::add_component).
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<Option<T>, ComponentError> {
        let (store, dirty) = self.entry_mut::<T>()?;
        let replaced = store.insert(entity, value);
        if let Some(tracker) = dirty {
            tracker.mark_dirty(entity.id as usize);
        }
        Ok(replaced)
    }

    /// Frees the value of `T` owned by `id` and clears its dirty flag.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn remove<T: Component>(&mut self, id: EntityId) -> Result<Option<T>, ComponentError> {
        let (store, dirty) = self.entry_mut::<T>()?;
        if let Some(tracker) = dirty {
            tracker.clear_one(id as usize);
        }
        Ok(store.remove_entity(id))
    }

    /// Enables dirty tracking for `T`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn track<T: Component>(&mut self) -> Result<(), ComponentError> {
        let id = self.id::<T>()?;
        self.entries[id.index()]
            .dirty
            .get_or_insert_with(DirtyTracker::default);
        Ok(())
    }

    /// Mask of every dirty-tracked type.
    #[must_use]
    pub fn tracking_mask(&self) -> u64 {
        self.tracked().fold(0, |mask, (bit, _)| mask | bit)
    }

    /// Flags `id` as dirty for `T`.
    ///
    /// Returns `false` if `T` is not tracked.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn mark_dirty<T: Component>(&mut self, id: EntityId) -> Result<bool, ComponentError> {
        let component = self.id::<T>()?;
        Ok(match self.entries[component.index()].dirty.as_mut() {
            Some(tracker) => {
                tracker.mark_dirty(id as usize);
                true
            }
            None => false,
        })
    }

    /// Checks if `id` is dirty for `T`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn is_dirty<T: Component>(&self, id: EntityId) -> Result<bool, ComponentError> {
        let component = self.id::<T>()?;
        Ok(self.entries[component.index()]
            .dirty
            .as_ref()
            .is_some_and(|tracker| tracker.is_dirty(id as usize)))
    }

    /// Mask of the tracked types for which `id` is dirty.
    #[must_use]
    pub fn dirty_mask(&self, id: EntityId) -> u64 {
        self.tracked()
            .filter(|(_, tracker)| tracker.is_dirty(id as usize))
            .fold(0, |mask, (bit, _)| mask | bit)
    }

    /// Dirty entity ids of `T` in ascending order. Empty if untracked.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Unregistered`] if `T` was never registered.
    pub fn dirty_entities<T: Component>(&self) -> Result<Vec<EntityId>, ComponentError> {
        let component = self.id::<T>()?;
        Ok(self.entries[component.index()]
            .dirty
            .as_ref()
            .map(|tracker| {
                tracker
                    .iter_dirty()
                    .filter_map(|index| EntityId::try_from(index).ok())
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Clears every dirty flag of every type.
    pub fn clear_dirty(&mut self) {
        for tracker in self.entries.iter_mut().filter_map(|entry| entry.dirty.as_mut()) {
            tracker.clear();
        }
    }

    /// Queues a destroyed entity's values to be freed at the next
    /// [`update`](Self::update).
    ///
    /// Queuing the same id twice in a frame merges the masks.
    pub fn queue_unregister(&mut self, entity: Entity) {
        match self.queued.get(&entity.id) {
            Some(&position) => self.unregister_queue[position].components |= entity.components,
            None => {
                self.queued.insert(entity.id, self.unregister_queue.len());
                self.unregister_queue.push(entity);
            }
        }
    }

    /// Number of entities waiting to be unregistered.
    #[must_use]
    pub fn pending_unregisters(&self) -> usize {
        self.unregister_queue.len()
    }

    /// Drains the unregister queue.
    ///
    /// For each queued entity, frees its value in every store whose bit is
    /// set in its mask, in ascending bit order. Returns the number of
    /// entities processed.
    pub fn update(&mut self) -> usize {
        let mut queue = std::mem::take(&mut self.unregister_queue);
        self.queued.clear();
        for entity in &queue {
            let mut bits = entity.components;
            while bits != 0 {
                let index = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                let Some(entry) = self.entries.get_mut(index) else {
                    tracing::warn!(id = entity.id, bit = index, "mask bit has no registered store");
                    continue;
                };
                entry.store.erase_entity(entity.id);
                if let Some(tracker) = entry.dirty.as_mut() {
                    tracker.clear_one(entity.id as usize);
                }
            }
        }

        if !queue.is_empty() {
            tracing::debug!(entities = queue.len(), "drained component unregister queue");
        }
        let processed = queue.len();
        // Keep the allocation for the next frame.
        queue.clear();
        self.unregister_queue = queue;
        processed
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Type name behind a component id.
    #[must_use]
    pub fn component_name(&self, id: ComponentId) -> Option<&'static str> {
        self.entries.get(id.index()).map(|entry| entry.store.type_name())
    }

    /// Number of values in the store behind a component id.
    #[must_use]
    pub fn store_len(&self, id: ComponentId) -> Option<usize> {
        self.entries.get(id.index()).map(|entry| entry.store.value_count())
    }

    /// Checks if the store behind `id` holds a value for `entity`.
    #[must_use]
    pub fn holds(&self, id: ComponentId, entity: EntityId) -> bool {
        self.entries
            .get(id.index())
            .is_some_and(|entry| entry.store.holds(entity))
    }

    fn entry_mut<T: Component>(
        &mut self,
    ) -> Result<(&mut ComponentStore<T>, Option<&mut DirtyTracker>), ComponentError> {
        let id = self.id::<T>()?;
        let entry = &mut self.entries[id.index()];
        let store = entry
            .store
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(ComponentError::TypeMismatch {
                id: id.get(),
                expected: type_name::<T>(),
            })?;
        Ok((store, entry.dirty.as_mut()))
    }

    fn tracked(&self) -> impl Iterator<Item = (u64, &DirtyTracker)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.dirty.as_ref().map(|tracker| (1u64 << index, tracker)))
    }
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.entries.iter().map(|entry| entry.store.type_name()).collect();
        f.debug_struct("ComponentManager")
            .field("components", &names)
            .field("tracking_mask", &self.tracking_mask())
            .field("pending_unregisters", &self.unregister_queue.len())
            .finish()
    }
}
