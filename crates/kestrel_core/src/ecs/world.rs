//! # ECS World
//!
//! [`World`] holds the data: the entity manager, the component manager and
//! the id counter. [`Engine`] pairs a world with a [`SystemManager`] and
//! drives the frame pipeline.
//!
//! # Frame pipeline
//!
//! 1. `EntityManager::update` commits last frame's entity adds and removes
//! 2. ordered systems run, then the render system, then the audio system
//! 3. `ComponentManager::update` frees the values of destroyed entities
//! 4. `EntityManager::clean_up` releases one-frame bookkeeping
//!
//! # Example
//!
//! ```rust
//! use kestrel_core::ecs::{Component, Engine};
//! use kestrel_core::index::MaskQuery;
//!
//! struct Position(f32, f32);
//! impl Component for Position {}
//!
//! let mut engine = Engine::new();
//! let world = engine.world_mut();
//! world.register_component::<Position>().unwrap();
//! let id = world.create_entity();
//! world.add_component(id, Position(0.0, 0.0)).unwrap();
//!
//! engine.update(0.016).unwrap();
//!
//! let mask = engine.world().bit::<Position>().unwrap();
//! let hits = engine.world().get_entities(&MaskQuery::new().with_all(mask));
//! assert_eq!(hits.len(), 1);
//! ```

use super::component::{Component, ComponentId, ComponentSet};
use super::entity::{Entity, EntityId, EntityManager, FlushStats};
use super::manager::ComponentManager;
use super::registry::RegistryBacking;
use super::system::{System, SystemManager};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::index::MaskQuery;

/// Entities, components and the id counter.
#[derive(Debug, Default)]
pub struct World {
    entities: EntityManager,
    components: ComponentManager,
    next_id: EntityId,
    config: CoreConfig,
}

impl World {
    /// Creates an empty world with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    /// Creates an empty world.
    #[must_use]
    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            entities: EntityManager::new(),
            components: ComponentManager::with_config(config.clone()),
            next_id: 0,
            config,
        }
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Registers a component type. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails once all 64 component bits are taken.
    pub fn register_component<T: Component>(&mut self) -> CoreResult<ComponentId> {
        Ok(self.components.register::<T>()?)
    }

    /// Registers a component type with an explicit registry backing.
    ///
    /// # Errors
    ///
    /// Fails once all 64 component bits are taken.
    pub fn register_component_with<T: Component>(
        &mut self,
        backing: RegistryBacking,
    ) -> CoreResult<ComponentId> {
        Ok(self.components.register_with::<T>(backing)?)
    }

    /// Enables dirty tracking for a registered type.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered.
    pub fn track_component<T: Component>(&mut self) -> CoreResult<()> {
        Ok(self.components.track::<T>()?)
    }

    /// Creates an entity with no components.
    ///
    /// The entity becomes queryable after the next entity flush.
    pub fn create_entity(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.add_entity(Entity::new(id));
        tracing::trace!(id, "created entity");
        id
    }

    /// Queues an entity for destruction.
    ///
    /// It stays queryable, with its component values, for the rest of the
    /// frame. Its values are freed at the end of the frame and it leaves the
    /// index at the next entity flush.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownEntity`] if the id was never created or is gone.
    pub fn destroy_entity(&mut self, id: EntityId) -> CoreResult<()> {
        let mask = self.entities.mask_of(id).ok_or(CoreError::UnknownEntity(id))?;
        if self.entities.is_pending_removal(id) {
            return Ok(());
        }
        let entity = Entity::with_components(id, mask);
        self.entities.remove_entity(entity);
        self.components.queue_unregister(entity);
        Ok(())
    }

    /// Attaches a component value, returning the value it replaced.
    ///
    /// The entity is re-keyed under its new mask before the value is stored.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered, or with [`CoreError::UnknownEntity`]
    /// if the entity is unknown or already queued for destruction.
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) -> CoreResult<Option<T>> {
        let bit = self.components.bit::<T>()?;
        let mask = self.entities.mask_of(id).ok_or(CoreError::UnknownEntity(id))?;
        if self.entities.is_pending_removal(id) {
            return Err(CoreError::UnknownEntity(id));
        }
        let entity = if mask & bit == 0 {
            self.entities
                .rekey(id, mask | bit)
                .ok_or(CoreError::UnknownEntity(id))?
        } else {
            Entity::with_components(id, mask)
        };
        Ok(self.components.insert(entity, value)?)
    }

    /// Detaches a component, returning its value.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity is unknown.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> CoreResult<Option<T>> {
        let bit = self.components.bit::<T>()?;
        let mask = self.entities.mask_of(id).ok_or(CoreError::UnknownEntity(id))?;
        if mask & bit == 0 {
            return Ok(None);
        }
        self.entities.rekey(id, mask & !bit);
        Ok(self.components.remove::<T>(id)?)
    }

    /// Component value of an entity.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered.
    pub fn component<T: Component>(&self, id: EntityId) -> CoreResult<Option<&T>> {
        Ok(self.components.get::<T>(id)?)
    }

    /// Component value of an entity, mutably. Marks it dirty when tracked.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered.
    pub fn component_mut<T: Component>(&mut self, id: EntityId) -> CoreResult<Option<&mut T>> {
        Ok(self.components.get_mut::<T>(id)?)
    }

    /// Mask of a set of component types.
    ///
    /// # Errors
    ///
    /// Fails if any type in `S` is not registered.
    pub fn mask<S: ComponentSet>(&self) -> CoreResult<u64> {
        Ok(self.components.mask::<S>()?)
    }

    /// Single-bit mask of a component type.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered.
    pub fn bit<T: Component>(&self) -> CoreResult<u64> {
        Ok(self.components.bit::<T>()?)
    }

    /// Committed entities matching `query`.
    #[must_use]
    pub fn get_entities(&self, query: &MaskQuery<u64>) -> Vec<Entity> {
        self.entities.get_entities(query)
    }

    /// Committed entities matching `query` and `predicate`.
    #[must_use]
    pub fn get_entities_where<F>(&self, query: &MaskQuery<u64>, predicate: F) -> Vec<Entity>
    where
        F: FnMut(&Entity) -> bool,
    {
        self.entities.get_entities_where(query, predicate)
    }

    /// Current entity value, pending or committed.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.entities
            .mask_of(id)
            .map(|mask| Entity::with_components(id, mask))
    }

    /// Number of committed entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entities.live_count()
    }

    /// Entity manager.
    #[must_use]
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Component manager.
    #[must_use]
    pub fn components(&self) -> &ComponentManager {
        &self.components
    }

    /// Component manager, mutably.
    pub fn components_mut(&mut self) -> &mut ComponentManager {
        &mut self.components
    }

    /// Commits buffered entity adds and removes. Step 1 of a frame.
    pub fn commit_entities(&mut self) -> FlushStats {
        self.entities.update()
    }

    /// Frees destroyed entities' values and one-frame bookkeeping. Steps 3
    /// and 4 of a frame.
    ///
    /// Returns the number of entities whose values were freed.
    pub fn finish_frame(&mut self) -> usize {
        let unregistered = self.components.update();
        self.entities.clean_up();
        unregistered
    }
}

/// Summary of one [`Engine::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Entity flush counts.
    pub flush: FlushStats,
    /// Systems run.
    pub systems_run: usize,
    /// Entities whose component values were freed.
    pub unregistered: usize,
}

/// A world plus the systems that run on it.
#[derive(Debug, Default)]
pub struct Engine {
    world: World,
    systems: SystemManager,
    frame: u64,
}

impl Engine {
    /// Creates an engine with an empty world and no systems.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine over a configured world.
    #[must_use]
    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            world: World::with_config(config),
            systems: SystemManager::new(),
            frame: 0,
        }
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The system manager, mutably.
    pub fn systems_mut(&mut self) -> &mut SystemManager {
        &mut self.systems
    }

    /// Appends a system to the ordered list.
    pub fn add_system(&mut self, system: impl System + 'static) {
        self.systems.add_system(system);
    }

    /// Number of completed frames.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Runs one frame.
    ///
    /// # Errors
    ///
    /// Returns the first system error. The frame is then abandoned: the
    /// unregister queue and one-frame bookkeeping are kept for the next
    /// successful frame.
    pub fn update(&mut self, dt: f32) -> CoreResult<FrameReport> {
        let span = tracing::debug_span!("frame", frame = self.frame + 1);
        let _enter = span.enter();

        let flush = self.world.commit_entities();
        let systems_run = self.systems.run(&mut self.world, dt)?;
        let unregistered = self.world.finish_frame();

        self.frame += 1;
        Ok(FrameReport {
            frame: self.frame,
            flush,
            systems_run,
            unregistered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct A(u32);
    impl Component for A {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct B(u32);
    impl Component for B {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct C;
    impl Component for C {}

    fn world_abc() -> World {
        let mut world = World::new();
        world.register_component::<A>().unwrap();
        world.register_component::<B>().unwrap();
        world.register_component::<C>().unwrap();
        world
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut world = World::new();
        assert_eq!(world.create_entity(), 0);
        assert_eq!(world.create_entity(), 1);
        assert_eq!(world.create_entity(), 2);
    }

    #[test]
    fn test_add_component_updates_mask() {
        let mut world = world_abc();
        let id = world.create_entity();
        world.add_component(id, A(1)).unwrap();
        world.add_component(id, B(2)).unwrap();

        assert_eq!(world.entity(id), Some(Entity::with_components(id, 0b011)));
        assert_eq!(world.component::<A>(id).unwrap(), Some(&A(1)));
    }

    #[test]
    fn test_add_component_twice_replaces() {
        let mut world = world_abc();
        let id = world.create_entity();
        assert_eq!(world.add_component(id, A(1)).unwrap(), None);
        assert_eq!(world.add_component(id, A(2)).unwrap(), Some(A(1)));
        assert_eq!(world.entity(id).map(|e| e.components), Some(0b001));
    }

    #[test]
    fn test_unknown_entity() {
        let mut world = world_abc();
        assert!(matches!(
            world.add_component(42, A(0)),
            Err(CoreError::UnknownEntity(42))
        ));
        assert!(matches!(world.destroy_entity(42), Err(CoreError::UnknownEntity(42))));
    }

    #[test]
    fn test_unregistered_component_propagates() {
        let mut world = World::new();
        let id = world.create_entity();
        assert!(matches!(world.add_component(id, A(0)), Err(CoreError::Component(_))));
    }

    #[test]
    fn test_remove_component_rekeys_committed_entity() {
        let mut world = world_abc();
        let id = world.create_entity();
        world.add_component(id, A(1)).unwrap();
        world.add_component(id, B(1)).unwrap();
        world.commit_entities();

        assert_eq!(world.remove_component::<A>(id).unwrap(), Some(A(1)));
        assert_eq!(world.remove_component::<A>(id).unwrap(), None);

        let with_a = world.get_entities(&MaskQuery::new().with_all(0b001));
        let with_b = world.get_entities(&MaskQuery::new().with_exactly(0b010));
        assert!(with_a.is_empty());
        assert_eq!(with_b, vec![Entity::with_components(id, 0b010)]);
    }

    #[test]
    fn test_destroyed_entity_keeps_values_until_frame_end() {
        let mut world = world_abc();
        let id = world.create_entity();
        world.add_component(id, A(5)).unwrap();
        world.commit_entities();

        world.destroy_entity(id).unwrap();
        world.destroy_entity(id).unwrap();
        assert_eq!(world.component::<A>(id).unwrap(), Some(&A(5)));
        assert_eq!(world.live_count(), 1);

        assert_eq!(world.finish_frame(), 1);
        assert_eq!(world.component::<A>(id).unwrap(), None);

        world.commit_entities();
        assert_eq!(world.live_count(), 0);
    }

    #[test]
    fn test_attach_after_destroy_is_rejected() {
        let mut world = world_abc();
        let id = world.create_entity();
        world.add_component(id, A(1)).unwrap();
        world.commit_entities();

        world.destroy_entity(id).unwrap();
        assert!(matches!(
            world.add_component(id, B(9)),
            Err(CoreError::UnknownEntity(e)) if e == id
        ));

        world.finish_frame();
        world.commit_entities();
        let b = world.components().id::<B>().unwrap();
        assert_eq!(world.component::<B>(id).unwrap(), None);
        assert_eq!(world.components().store_len(b), Some(0));
        assert_eq!(world.entity(id), None);
    }

    struct Failing;

    impl System for Failing {
        fn update(&mut self, _world: &mut World, _dt: f32) -> CoreResult<()> {
            Err(CoreError::UnknownEntity(99))
        }
    }

    #[test]
    fn test_failing_system_abandons_the_frame() {
        let mut engine = Engine::new();
        engine.world_mut().register_component::<A>().unwrap();
        let id = engine.world_mut().create_entity();
        engine.world_mut().add_component(id, A(3)).unwrap();
        engine.update(0.016).unwrap();

        engine.world_mut().destroy_entity(id).unwrap();
        engine.add_system(Failing);
        assert!(matches!(engine.update(0.016), Err(CoreError::UnknownEntity(99))));

        // No frame-end step ran: the value is still queued for release.
        assert_eq!(engine.frame(), 1);
        assert_eq!(engine.world().components().pending_unregisters(), 1);
        assert_eq!(engine.world().component::<A>(id).unwrap(), Some(&A(3)));
    }

    #[test]
    fn test_engine_counts_frames() {
        let mut engine = Engine::new();
        engine.world_mut().create_entity();

        let report = engine.update(0.016).unwrap();
        assert_eq!(report.frame, 1);
        assert_eq!(report.flush.added, 1);
        assert_eq!(report.systems_run, 0);

        let report = engine.update(0.016).unwrap();
        assert_eq!(report.frame, 2);
        assert_eq!(report.flush, FlushStats::default());
        assert_eq!(engine.frame(), 2);
    }

    #[test]
    fn test_get_entities_where() {
        let mut world = world_abc();
        for _ in 0..4 {
            let id = world.create_entity();
            world.add_component(id, C).unwrap();
        }
        world.commit_entities();

        let even = world.get_entities_where(&MaskQuery::new().with_all(0b100), |e| e.id % 2 == 0);
        let mut ids: Vec<_> = even.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2]);
    }
}
