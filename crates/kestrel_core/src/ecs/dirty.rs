//! Per-entity dirty flags for one component type.

/// Dirty bitset indexed by entity id.
///
/// At 64 entities per u64, tracking 1M entity ids takes about 122KB. The
/// bitset grows on demand when an id lands past the end.
///
/// ## Performance
///
/// - Mark dirty: O(1) amortized
/// - Clear all: O(n/64) where n = highest marked id
/// - Iterate dirty: O(words + dirty_count)
#[derive(Clone, Debug, Default)]
pub struct DirtyTracker {
    /// Bitset: 1 = dirty, 0 = clean.
    bits: Vec<u64>,
    /// Cached count of dirty entities.
    dirty_count: usize,
}

impl DirtyTracker {
    /// Creates a tracker with room for ids below `capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0u64; capacity.div_ceil(64)],
            dirty_count: 0,
        }
    }

    /// Marks an entity id as dirty.
    #[inline]
    pub fn mark_dirty(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let mask = 1u64 << (index % 64);
        if self.bits[word] & mask == 0 {
            self.bits[word] |= mask;
            self.dirty_count += 1;
        }
    }

    /// Clears the flag of one entity id.
    #[inline]
    pub fn clear_one(&mut self, index: usize) {
        let mask = 1u64 << (index % 64);
        if let Some(word) = self.bits.get_mut(index / 64) {
            if *word & mask != 0 {
                *word &= !mask;
                self.dirty_count -= 1;
            }
        }
    }

    /// Checks if an entity id is dirty.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self, index: usize) -> bool {
        let word = self.bits.get(index / 64).copied().unwrap_or(0);
        (word >> (index % 64)) & 1 == 1
    }

    /// Clears all dirty flags, keeping the allocation.
    pub fn clear(&mut self) {
        self.bits.fill(0);
        self.dirty_count = 0;
    }

    /// Returns the number of dirty entities.
    #[inline]
    #[must_use]
    pub const fn dirty_count(&self) -> usize {
        self.dirty_count
    }

    /// Checks if any entity is dirty.
    #[inline]
    #[must_use]
    pub const fn has_dirty(&self) -> bool {
        self.dirty_count > 0
    }

    /// Iterates over dirty entity ids in ascending order.
    ///
    /// Uses `trailing_zeros` to skip clean regions.
    pub fn iter_dirty(&self) -> DirtyIter<'_> {
        DirtyIter {
            bits: &self.bits,
            word_idx: 0,
            current_word: self.bits.first().copied().unwrap_or(0),
        }
    }
}

/// Iterator over dirty entity ids.
pub struct DirtyIter<'a> {
    bits: &'a [u64],
    word_idx: usize,
    current_word: u64,
}

impl Iterator for DirtyIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit = self.current_word.trailing_zeros() as usize;
                // Clear lowest set bit
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            self.current_word = *self.bits.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_query() {
        let mut tracker = DirtyTracker::new(128);
        tracker.mark_dirty(0);
        tracker.mark_dirty(65);
        tracker.mark_dirty(65);

        assert!(tracker.is_dirty(0));
        assert!(tracker.is_dirty(65));
        assert!(!tracker.is_dirty(1));
        assert_eq!(tracker.dirty_count(), 2);
    }

    #[test]
    fn test_grows_on_demand() {
        let mut tracker = DirtyTracker::default();
        assert!(!tracker.is_dirty(1000));

        tracker.mark_dirty(1000);
        assert!(tracker.is_dirty(1000));
        assert_eq!(tracker.dirty_count(), 1);
    }

    #[test]
    fn test_clear_one_and_all() {
        let mut tracker = DirtyTracker::new(64);
        tracker.mark_dirty(3);
        tracker.mark_dirty(9);

        tracker.clear_one(3);
        tracker.clear_one(3);
        tracker.clear_one(4000);
        assert_eq!(tracker.dirty_count(), 1);

        tracker.clear();
        assert!(!tracker.has_dirty());
        assert!(!tracker.is_dirty(9));
    }

    #[test]
    fn test_iter_ascending() {
        let mut tracker = DirtyTracker::new(256);
        for index in [200, 3, 64, 63, 130] {
            tracker.mark_dirty(index);
        }

        let dirty: Vec<_> = tracker.iter_dirty().collect();
        assert_eq!(dirty, vec![3, 63, 64, 130, 200]);
    }

    #[test]
    fn test_iter_empty() {
        assert_eq!(DirtyTracker::new(0).iter_dirty().count(), 0);
    }
}
