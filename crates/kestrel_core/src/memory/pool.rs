//! # Generational Pool
//!
//! Typed slot arena that hands out `(index, generation)` handles.
//!
//! Every removal bumps the slot's generation, so a handle that outlived its
//! value fails the generation check instead of reading whatever was stored
//! in the slot afterwards.

use bytemuck::{Pod, Zeroable};

use crate::error::PoolError;

/// Handle to a value stored in a [`Pool`].
///
/// A handle is valid iff its generation is non-zero and equals the current
/// generation of the slot it points at.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Handle {
    /// Slot index inside the pool.
    index: u32,
    /// Generation the slot had when the value was inserted.
    generation: u32,
}

impl Handle {
    /// The null handle. Never valid in any pool.
    pub const NULL: Self = Self {
        index: 0,
        generation: 0,
    };

    /// Creates a handle from raw parts.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Checks if this is the null handle (generation zero).
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.generation == 0
    }
}

/// A growable pool of `T` addressed by generational [`Handle`]s.
///
/// Growth doubles the capacity and appends new slots; existing slot numbers
/// never move, so handles survive any number of resizes.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread.
///
/// # Example
///
/// ```rust
/// use kestrel_core::memory::Pool;
///
/// let mut pool: Pool<&str> = Pool::new(2);
/// let handle = pool.insert("vertex buffer");
/// assert_eq!(pool.get(handle), Some(&"vertex buffer"));
///
/// pool.remove(handle);
/// assert_eq!(pool.get(handle), None);
/// ```
pub struct Pool<T> {
    /// The storage array.
    slots: Vec<Option<T>>,
    /// Current generation of every slot. Never zero.
    generations: Vec<u32>,
    /// Free list - indices of available slots.
    free_list: Vec<u32>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Pool<T> {
    /// Creates a new pool with the specified initial capacity.
    ///
    /// A capacity of zero is promoted to one.
    ///
    /// # Panics
    ///
    /// Panics if the capacity does not fit a `u32` slot index.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut pool = Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        };
        pool.extend_to(capacity);
        pool
    }

    /// Returns the declared capacity (number of slots).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of live values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the pool holds no live values.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores a value and returns its handle.
    ///
    /// Doubles the capacity first if every slot is taken.
    pub fn insert(&mut self, value: T) -> Handle {
        if self.free_list.is_empty() {
            let grown = self.capacity() * 2;
            tracing::debug!(from = self.capacity(), to = grown, "growing pool");
            self.extend_to(grown);
        }

        let Some(index) = self.free_list.pop() else {
            unreachable!("pool free list is refilled before every insert");
        };
        let slot = index as usize;
        self.slots[slot] = Some(value);
        self.len += 1;

        Handle::new(index, self.generations[slot])
    }

    /// Removes the value behind `handle`, invalidating every copy of it.
    ///
    /// Returns `None` (and changes nothing) if the handle is stale or null.
    ///
    /// # Panics
    ///
    /// Panics if the handle's index is beyond the pool's capacity.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }

        let slot = handle.index as usize;
        let value = self.slots[slot].take()?;
        self.generations[slot] = next_generation(self.generations[slot]);
        self.free_list.push(handle.index);
        self.len -= 1;

        Some(value)
    }

    /// Checks whether `handle` still refers to a live value.
    ///
    /// # Panics
    ///
    /// Panics if the handle's index is beyond the pool's capacity.
    #[must_use]
    pub fn is_valid(&self, handle: Handle) -> bool {
        if handle.is_null() {
            return false;
        }
        let slot = self.checked_slot(handle);
        self.generations[slot] == handle.generation && self.slots[slot].is_some()
    }

    /// Gets a reference to the value behind `handle`.
    ///
    /// Stale and null handles yield `None`.
    ///
    /// # Panics
    ///
    /// Panics if the handle's index is beyond the pool's capacity.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.index as usize].as_ref()
    }

    /// Gets a mutable reference to the value behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle's index is beyond the pool's capacity.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.index as usize].as_mut()
    }

    /// Non-panicking lookup that reports why a handle failed.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfBounds`] if the index is beyond the capacity,
    /// [`PoolError::Stale`] if the slot was recycled or never filled.
    pub fn try_get(&self, handle: Handle) -> Result<&T, PoolError> {
        let slot = handle.index as usize;
        if slot >= self.capacity() {
            return Err(PoolError::OutOfBounds {
                index: handle.index,
                capacity: self.capacity(),
            });
        }

        let current = self.generations[slot];
        match self.slots[slot].as_ref() {
            Some(value) if !handle.is_null() && current == handle.generation => Ok(value),
            _ => Err(PoolError::Stale {
                index: handle.index,
                generation: handle.generation,
                current,
            }),
        }
    }

    /// Removes every value, invalidating all outstanding handles.
    ///
    /// Capacity is kept.
    pub fn clear(&mut self) {
        for (slot, value) in self.slots.iter_mut().enumerate() {
            if value.take().is_some() {
                self.generations[slot] = next_generation(self.generations[slot]);
            }
        }
        let capacity = self.slots.len();
        self.free_list.clear();
        self.free_list.extend((0..capacity).rev().map(slot_index));
        self.len = 0;
    }

    /// Iterates over all live values with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(slot, (value, &generation))| {
                value
                    .as_ref()
                    .map(|v| (Handle::new(slot_index(slot), generation), v))
            })
    }

    /// Appends free slots until the pool holds `capacity` slots.
    fn extend_to(&mut self, capacity: usize) {
        let old = self.slots.len();
        if capacity <= old {
            return;
        }
        self.slots.resize_with(capacity, || None);
        self.generations.resize(capacity, 1);
        // Lowest new index pops first.
        self.free_list.extend((old..capacity).rev().map(slot_index));
    }

    /// Bounds-checks the handle's index against the declared capacity.
    fn checked_slot(&self, handle: Handle) -> usize {
        let slot = handle.index as usize;
        assert!(
            slot < self.slots.len(),
            "pool handle index {slot} out of bounds (capacity {})",
            self.slots.len()
        );
        slot
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// Next generation after a removal. Zero is reserved for null handles.
#[inline]
fn next_generation(generation: u32) -> u32 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

/// Converts a slot number to a handle index.
fn slot_index(slot: usize) -> u32 {
    u32::try_from(slot).unwrap_or_else(|_| panic!("pool slot {slot} exceeds u32 index space"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_insert_get_remove() {
        let mut pool: Pool<u32> = Pool::new(4);

        let h1 = pool.insert(42);
        assert_eq!(pool.get(h1), Some(&42));
        assert_eq!(pool.len(), 1);

        assert_eq!(pool.remove(h1), Some(42));
        assert!(pool.is_empty());
        assert_eq!(pool.get(h1), None);
    }

    #[test]
    fn test_remove_stale_is_noop() {
        let mut pool: Pool<u32> = Pool::new(2);
        let h1 = pool.insert(1);
        pool.remove(h1);
        let h2 = pool.insert(2);

        // Stale handle must not remove the new occupant.
        assert_eq!(pool.remove(h1), None);
        assert_eq!(pool.get(h2), Some(&2));
    }

    #[test]
    fn test_generation_increases_on_reuse() {
        let mut pool: Pool<u32> = Pool::new(1);

        let h1 = pool.insert(1);
        pool.remove(h1);
        let h2 = pool.insert(2);

        assert_eq!(h1.index(), h2.index()); // Same slot reused
        assert!(h2.generation() > h1.generation());
        assert!(!pool.is_valid(h1));
        assert!(pool.is_valid(h2));
    }

    #[test]
    fn test_growth_preserves_handles() {
        let mut pool: Pool<usize> = Pool::new(2);
        let handles: Vec<Handle> = (0..37).map(|i| pool.insert(i * 10)).collect();

        assert!(pool.capacity() >= 37);
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(pool.get(*handle), Some(&(i * 10)));
        }
    }

    #[test]
    fn test_growth_doubles_capacity() {
        let mut pool: Pool<u8> = Pool::new(4);
        for i in 0..5 {
            pool.insert(i);
        }
        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    fn test_null_handle_is_never_valid() {
        let mut pool: Pool<u8> = Pool::new(1);
        let _ = pool.insert(7);
        assert!(!pool.is_valid(Handle::NULL));
        assert_eq!(pool.get(Handle::NULL), None);
    }

    #[test]
    fn test_forged_handle_to_empty_slot() {
        let pool: Pool<u8> = Pool::new(4);
        // Generation 1 matches a fresh slot, but nothing lives there.
        assert_eq!(pool.get(Handle::new(3, 1)), None);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_range_index_panics() {
        let pool: Pool<u8> = Pool::new(4);
        let _ = pool.get(Handle::new(9, 1));
    }

    #[test]
    fn test_try_get_reports_reason() {
        let mut pool: Pool<u8> = Pool::new(2);
        let handle = pool.insert(3);
        assert_eq!(pool.try_get(handle), Ok(&3));

        pool.remove(handle);
        assert!(matches!(pool.try_get(handle), Err(PoolError::Stale { .. })));
        assert!(matches!(
            pool.try_get(Handle::new(100, 1)),
            Err(PoolError::OutOfBounds { index: 100, .. })
        ));
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut pool: Pool<u8> = Pool::new(4);
        let a = pool.insert(1);
        let b = pool.insert(2);

        pool.clear();
        assert!(pool.is_empty());
        assert!(!pool.is_valid(a));
        assert!(!pool.is_valid(b));

        let c = pool.insert(3);
        assert_eq!(pool.get(c), Some(&3));
    }

    #[test]
    fn test_iter_yields_live_values() {
        let mut pool: Pool<u8> = Pool::new(4);
        let a = pool.insert(1);
        let b = pool.insert(2);
        pool.remove(a);

        let live: Vec<_> = pool.iter().collect();
        assert_eq!(live, vec![(b, &2)]);
    }

    #[test]
    fn test_get_mut_in_place() {
        let mut pool: Pool<String> = Pool::new(1);
        let handle = pool.insert("a".to_owned());
        if let Some(value) = pool.get_mut(handle) {
            value.push('b');
        }
        assert_eq!(pool.get(handle).map(String::as_str), Some("ab"));
    }
}
