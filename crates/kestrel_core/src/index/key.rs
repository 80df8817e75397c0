//! Fixed-width integer keys for the radix trie.

use std::fmt::Debug;
use std::hash::Hash;

/// Bits decoded per trie level (one hex nibble).
pub const NIBBLE_BITS: u32 = 4;

/// A fixed-width bitmask usable as a radix-trie key.
///
/// The trie works on the key's bits widened to `u64`; `BITS` decides how
/// many nibble levels a trie over this key has.
pub trait MaskKey: Copy + Eq + Hash + Debug + 'static {
    /// Width of the key in bits. Must be a multiple of 4, at most 64.
    const BITS: u32;

    /// Number of trie levels (nibbles) for this key width.
    const LEVELS: u32 = Self::BITS / NIBBLE_BITS;

    /// The key's bits, zero-extended.
    fn to_bits(self) -> u64;

    /// Builds a key from bits, truncating anything above `BITS`.
    fn from_bits(bits: u64) -> Self;
}

macro_rules! impl_mask_key {
    ($($ty:ty),*) => {
        $(
            impl MaskKey for $ty {
                const BITS: u32 = <$ty>::BITS;

                #[inline]
                fn to_bits(self) -> u64 {
                    u64::from(self)
                }

                #[inline]
                #[allow(clippy::cast_possible_truncation)]
                fn from_bits(bits: u64) -> Self {
                    bits as $ty
                }
            }
        )*
    };
}

impl_mask_key!(u8, u16, u32, u64);

/// Extracts the nibble decoded at `level` (0 = least significant).
#[inline]
pub(crate) const fn nibble_at(bits: u64, level: u32) -> usize {
    ((bits >> (level * NIBBLE_BITS)) & 0xF) as usize
}
