//! Set predicates over bitmask keys.

use super::key::{MaskKey, NIBBLE_BITS};

/// A conjunction of up to four mask predicates.
///
/// A predicate whose mask is zero is inactive and constrains nothing. In
/// particular `has_any == 0` means "any key", not "no key".
///
/// # Example
///
/// ```rust
/// use kestrel_core::index::MaskQuery;
///
/// let query = MaskQuery::new().with_all(0b011_u64).without(0b100);
/// assert!(query.matches(0b011));
/// assert!(query.matches(0b1011));
/// assert!(!query.matches(0b111));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaskQuery<K> {
    /// Every bit of this mask must be set.
    pub has_all: K,
    /// At least one bit of this mask must be set.
    pub has_any: K,
    /// The key must equal this mask.
    pub has_exactly: K,
    /// No bit of this mask may be set.
    pub excludes: K,
}

impl<K: MaskKey> MaskQuery<K> {
    /// A query that matches every key.
    #[must_use]
    pub fn new() -> Self {
        let zero = K::from_bits(0);
        Self {
            has_all: zero,
            has_any: zero,
            has_exactly: zero,
            excludes: zero,
        }
    }

    /// Requires every bit of `mask`.
    #[must_use]
    pub fn with_all(mut self, mask: K) -> Self {
        self.has_all = mask;
        self
    }

    /// Requires at least one bit of `mask`.
    #[must_use]
    pub fn with_any(mut self, mask: K) -> Self {
        self.has_any = mask;
        self
    }

    /// Requires the key to equal `mask`.
    #[must_use]
    pub fn with_exactly(mut self, mask: K) -> Self {
        self.has_exactly = mask;
        self
    }

    /// Rejects keys sharing any bit with `mask`.
    #[must_use]
    pub fn without(mut self, mask: K) -> Self {
        self.excludes = mask;
        self
    }

    /// Full check of a complete key.
    #[must_use]
    pub fn matches(&self, key: K) -> bool {
        let key = key.to_bits();
        let all = self.has_all.to_bits();
        let any = self.has_any.to_bits();
        let exactly = self.has_exactly.to_bits();

        key & all == all
            && (any == 0 || key & any != 0)
            && (exactly == 0 || key == exactly)
            && key & self.excludes.to_bits() == 0
    }

    /// Decides whether a branch decoding `nibble` at `level` can still lead
    /// to a matching key.
    ///
    /// `any_hit` says whether a `has_any` bit was already set higher up the
    /// path. Returns the updated flag, or `None` to prune the branch.
    pub(crate) fn admit(&self, nibble: usize, level: u32, any_hit: bool) -> Option<bool> {
        let shift = level * NIBBLE_BITS;
        let value = nibble as u64;
        let part = |mask: K| (mask.to_bits() >> shift) & 0xF;

        let all = part(self.has_all);
        if value & all != all || value & part(self.excludes) != 0 {
            return None;
        }

        if self.has_exactly.to_bits() != 0 && value != part(self.has_exactly) {
            return None;
        }

        let any = self.has_any.to_bits();
        if any == 0 || any_hit {
            return Some(true);
        }
        if value & part(self.has_any) != 0 {
            return Some(true);
        }

        // No hit yet: only keep going if lower nibbles can still provide one.
        let below = any & ((1_u64 << shift) - 1);
        (below != 0).then_some(false)
    }
}

impl<K: MaskKey> Default for MaskQuery<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_predicates_match_everything() {
        let query = MaskQuery::<u64>::new();
        assert!(query.matches(0));
        assert!(query.matches(u64::MAX));
    }

    #[test]
    fn test_has_any_zero_is_unconstrained() {
        let query = MaskQuery::<u32>::new().with_any(0).with_all(0b1);
        assert!(query.matches(0b1));
        assert!(query.matches(0b11));
    }

    #[test]
    fn test_each_predicate() {
        let all = MaskQuery::<u64>::new().with_all(0b101);
        assert!(all.matches(0b111));
        assert!(!all.matches(0b100));

        let any = MaskQuery::<u64>::new().with_any(0b110);
        assert!(any.matches(0b010));
        assert!(!any.matches(0b001));

        let exactly = MaskQuery::<u64>::new().with_exactly(0b11);
        assert!(exactly.matches(0b11));
        assert!(!exactly.matches(0b111));

        let excludes = MaskQuery::<u64>::new().without(0b1000);
        assert!(excludes.matches(0b0111));
        assert!(!excludes.matches(0b1001));
    }

    #[test]
    fn test_admit_prunes_missing_required_bits() {
        let query = MaskQuery::<u64>::new().with_all(0x30);
        assert_eq!(query.admit(0x3, 1, false), Some(true));
        assert_eq!(query.admit(0x1, 1, false), None);
        // Level 0 carries no required bits.
        assert_eq!(query.admit(0x0, 0, false), Some(true));
    }

    #[test]
    fn test_admit_tracks_any_hit() {
        // has_any bits at level 1 and level 0.
        let query = MaskQuery::<u64>::new().with_any(0x11);
        assert_eq!(query.admit(0x0, 1, false), Some(false));
        assert_eq!(query.admit(0x1, 1, false), Some(true));
        // Missed at level 0 with nothing below: dead end.
        assert_eq!(query.admit(0x0, 0, false), None);
        assert_eq!(query.admit(0x0, 0, true), Some(true));
    }

    #[test]
    fn test_admit_exactly_requires_equal_nibble() {
        let query = MaskQuery::<u32>::new().with_exactly(0x20);
        assert_eq!(query.admit(0x2, 1, false), Some(true));
        assert_eq!(query.admit(0x3, 1, false), None);
        assert_eq!(query.admit(0x1, 0, false), None);
    }
}
