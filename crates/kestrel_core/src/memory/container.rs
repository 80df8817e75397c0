//! # Container
//!
//! Dense growable storage with free-list slot reuse.
//!
//! Unlike [`Pool`](super::Pool) there is no generation check: callers own
//! the index bookkeeping. Containers back per-component-type storage and the
//! leaf buckets of the radix trie.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Dense store of `T` with hole reuse.
///
/// Removing a value leaves a hole that the next insert fills. Values are
/// never moved, so indices stay stable for as long as the value lives.
pub struct Container<T> {
    /// Slot storage. `None` marks a hole.
    slots: Vec<Option<T>>,
    /// Holes available for reuse (LIFO).
    free_list: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
    /// Slot written by the most recent insert.
    last_written: Option<usize>,
}

impl<T> Container<T> {
    /// Creates an empty container.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            last_written: None,
        }
    }

    /// Creates an empty container with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
            last_written: None,
        }
    }

    /// Returns the number of stored values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots, occupied or not.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the slot written by the most recent [`insert`](Self::insert).
    #[inline]
    #[must_use]
    pub const fn last_written(&self) -> Option<usize> {
        self.last_written
    }

    /// Stores a value, reusing a hole if one exists, and returns its index.
    pub fn insert(&mut self, value: T) -> usize {
        let index = if let Some(index) = self.free_list.pop() {
            self.slots[index] = Some(value);
            index
        } else {
            self.slots.push(Some(value));
            self.slots.len() - 1
        };
        self.len += 1;
        self.last_written = Some(index);
        index
    }

    /// Removes the value at `index`, leaving a reusable hole.
    ///
    /// Removing the most recently written slot resets
    /// [`last_written`](Self::last_written).
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take()?;
        self.free_list.push(index);
        self.len -= 1;
        if self.last_written == Some(index) {
            self.last_written = None;
        }
        Some(value)
    }

    /// Gets the value at `index`, if the slot is occupied.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()
    }

    /// Gets the value at `index` mutably, if the slot is occupied.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// Checks if the slot at `index` is occupied.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Iterates over occupied slots with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|v| (index, v)))
    }

    /// Drops every value. Slot storage is released.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.len = 0;
        self.last_written = None;
    }
}

impl<T: fmt::Debug> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("len", &self.len)
            .field("slots", &self.slots.len())
            .field("last_written", &self.last_written)
            .finish_non_exhaustive()
    }
}

impl<T> Default for Container<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for Container<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the slot is out of range or a hole.
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("container slot {index} is empty (slots: {})", self.slots.len()),
        }
    }
}

impl<T> IndexMut<usize> for Container<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let slots = self.slots.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("container slot {index} is empty (slots: {slots})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut container = Container::new();
        let a = container.insert("a");
        let b = container.insert("b");

        assert_eq!(container.get(a), Some(&"a"));
        assert_eq!(container.len(), 2);
        assert_eq!(container.remove(a), Some("a"));
        assert_eq!(container.get(a), None);
        assert_eq!(container[b], "b");
    }

    #[test]
    fn test_hole_reuse() {
        let mut container = Container::new();
        let a = container.insert(1);
        let _ = container.insert(2);
        container.remove(a);

        let c = container.insert(3);
        assert_eq!(a, c); // Hole filled, no compaction
        assert_eq!(container.slot_count(), 2);
        assert_eq!(container.last_written(), Some(c));
    }

    #[test]
    fn test_double_remove_is_noop() {
        let mut container = Container::new();
        let a = container.insert(1);
        assert_eq!(container.remove(a), Some(1));
        assert_eq!(container.remove(a), None);
        assert_eq!(container.remove(99), None);
        assert!(container.is_empty());
    }

    #[test]
    fn test_iter_skips_holes() {
        let mut container = Container::new();
        let a = container.insert(10);
        let b = container.insert(20);
        let c = container.insert(30);
        container.remove(b);

        let values: Vec<_> = container.iter().collect();
        assert_eq!(values, vec![(a, &10), (c, &30)]);
    }

    #[test]
    fn test_removing_last_written_resets_it() {
        let mut container = Container::new();
        let a = container.insert(1);
        let b = container.insert(2);

        container.remove(a);
        assert_eq!(container.last_written(), Some(b));
        container.remove(b);
        assert_eq!(container.last_written(), None);
    }

    #[test]
    fn test_debug_summary() {
        let mut container = Container::new();
        container.insert("mesh");
        let text = format!("{container:?}");
        assert!(text.starts_with("Container"));
        assert!(text.contains("len: 1"));
    }

    #[test]
    #[should_panic(expected = "is empty")]
    fn test_index_hole_panics() {
        let mut container = Container::new();
        let a = container.insert(1);
        container.remove(a);
        let _ = container[a];
    }
}
