//! # Entity Management
//!
//! Entities are plain values: a stable id plus the bitmask of attached
//! component types. The live set is indexed by that mask in a radix trie,
//! so "every entity with Transform and Mesh but no Hidden" is a trie walk,
//! not a scan.
//!
//! Structural changes are buffered. [`EntityManager::add_entity`] and
//! [`EntityManager::remove_entity`] only append to per-frame buffers; the
//! trie changes in [`EntityManager::update`], which runs once at the start
//! of a frame. Queries issued while systems run therefore see one stable
//! snapshot.

use std::collections::HashMap;

use super::component::ComponentId;
use crate::index::{MaskQuery, RadixTrie};

/// Stable entity identity, assigned monotonically by the world.
pub type EntityId = u32;

/// An entity and the set of component types attached to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Stable identity.
    pub id: EntityId,
    /// Bitmask of attached components (up to 64 component types).
    pub components: u64,
}

impl Entity {
    /// Creates an entity with no components.
    #[inline]
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self { id, components: 0 }
    }

    /// Creates an entity with the given component mask.
    #[inline]
    #[must_use]
    pub const fn with_components(id: EntityId, components: u64) -> Self {
        Self { id, components }
    }

    /// Checks if this entity has a specific component.
    #[inline]
    #[must_use]
    pub const fn has_component(self, component: ComponentId) -> bool {
        self.components & component.bit() != 0
    }

    /// Adds a component flag to this entity.
    #[inline]
    pub fn add_component(&mut self, component: ComponentId) {
        self.components |= component.bit();
    }

    /// Removes a component flag from this entity.
    #[inline]
    pub fn remove_component(&mut self, component: ComponentId) {
        self.components &= !component.bit();
    }
}

/// Counts from one [`EntityManager::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Entities committed to the trie.
    pub added: usize,
    /// Entities taken out of the trie.
    pub removed: usize,
}

/// Owns the live-entity trie and the per-frame add/remove buffers.
#[derive(Debug, Default)]
pub struct EntityManager {
    /// Live entities keyed by component mask.
    live: RadixTrie<u64, Entity>,
    /// Committed key of every live entity.
    keys: HashMap<EntityId, u64>,
    /// Pending additions, flushed first.
    to_add: Vec<Entity>,
    /// Pending removals, flushed after additions.
    to_remove: Vec<Entity>,
    /// Entities taken out by the last flush; released by `clean_up`.
    removed: Vec<Entity>,
}

impl EntityManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `entity` for insertion at the next [`update`](Self::update).
    pub fn add_entity(&mut self, entity: Entity) {
        self.to_add.push(entity);
    }

    /// Queues `entity` for removal at the next [`update`](Self::update).
    ///
    /// The entity stays queryable until then.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.to_remove.push(entity);
    }

    /// Commits the buffered additions, then the buffered removals.
    ///
    /// Both buffers are applied in FIFO order and left empty. Flushing empty
    /// buffers is a no-op.
    pub fn update(&mut self) -> FlushStats {
        let mut stats = FlushStats::default();

        for entity in self.to_add.drain(..) {
            if let Some(previous) = self.keys.insert(entity.id, entity.components) {
                if previous != entity.components {
                    self.live.remove_where(previous, |e| e.id == entity.id);
                }
            }
            self.live.upsert(entity.components, entity, |e| e.id == entity.id);
            stats.added += 1;
        }

        for entity in self.to_remove.drain(..) {
            let Some(key) = self.keys.remove(&entity.id) else {
                tracing::trace!(id = entity.id, "removal of uncommitted entity ignored");
                continue;
            };
            if let Some(removed) = self.live.remove_where(key, |e| e.id == entity.id) {
                self.removed.push(removed);
                stats.removed += 1;
            }
        }

        if stats.added > 0 || stats.removed > 0 {
            tracing::debug!(
                added = stats.added,
                removed = stats.removed,
                live = self.live.len(),
                "flushed entity buffers"
            );
        }
        stats
    }

    /// Moves an entity to the trie position for `components`.
    ///
    /// A committed entity is taken out under its old key and re-added under
    /// the new one immediately; a pending addition is edited in its buffer.
    /// Returns the updated entity, or `None` if the id is unknown.
    pub fn rekey(&mut self, id: EntityId, components: u64) -> Option<Entity> {
        if let Some(pending) = self.to_add.iter_mut().rev().find(|e| e.id == id) {
            pending.components = components;
            return Some(*pending);
        }

        let key = self.keys.get_mut(&id)?;
        let old = std::mem::replace(key, components);
        let mut entity = self
            .live
            .remove_where(old, |e| e.id == id)
            .unwrap_or_else(|| Entity::new(id));
        entity.components = components;
        self.live.upsert(components, entity, |e| e.id == id);
        Some(entity)
    }

    /// Current component mask of an entity, pending or committed.
    #[must_use]
    pub fn mask_of(&self, id: EntityId) -> Option<u64> {
        self.to_add
            .iter()
            .rev()
            .find(|e| e.id == id)
            .map(|e| e.components)
            .or_else(|| self.keys.get(&id).copied())
    }

    /// Checks if the entity is committed to the trie.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Checks if a removal is queued for the entity.
    #[must_use]
    pub fn is_pending_removal(&self, id: EntityId) -> bool {
        self.to_remove.iter().any(|e| e.id == id)
    }

    /// Every committed entity whose mask satisfies `query`.
    #[must_use]
    pub fn get_entities(&self, query: &MaskQuery<u64>) -> Vec<Entity> {
        let mut hits = Vec::new();
        self.live.for_each_match(query, |_, entity| hits.push(*entity));
        hits
    }

    /// Like [`get_entities`](Self::get_entities), keeping only entities for
    /// which `predicate` holds.
    #[must_use]
    pub fn get_entities_where<F>(&self, query: &MaskQuery<u64>, mut predicate: F) -> Vec<Entity>
    where
        F: FnMut(&Entity) -> bool,
    {
        let mut hits = Vec::new();
        self.live.for_each_match(query, |_, entity| {
            if predicate(entity) {
                hits.push(*entity);
            }
        });
        hits
    }

    /// Entities taken out of the trie by the last [`update`](Self::update).
    #[must_use]
    pub fn removed_last_flush(&self) -> &[Entity] {
        &self.removed
    }

    /// Releases one-frame bookkeeping.
    pub fn clean_up(&mut self) {
        self.removed.clear();
    }

    /// Number of committed entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of queued additions.
    #[must_use]
    pub fn pending_adds(&self) -> usize {
        self.to_add.len()
    }

    /// Number of queued removals.
    #[must_use]
    pub fn pending_removes(&self) -> usize {
        self.to_remove.len()
    }
}
