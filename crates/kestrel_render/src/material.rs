//! # Material Flags
//!
//! A 32-bit mask describing how a material is drawn. Draw batches are
//! indexed by it, so "every transparent, non-skinned batch" is a trie query.
//!
//! Batches are visited in ascending flag order, which puts opaque geometry
//! (low bits) ahead of transparent geometry (bit 8 and up).

use std::ops::{BitAnd, BitOr, BitOrAssign};

use bytemuck::{Pod, Zeroable};
use kestrel_core::MaskKey;

/// Material bitmask.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct MaterialFlags(u32);

impl MaterialFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Writes depth, no blending.
    pub const OPAQUE: Self = Self(1 << 0);
    /// Alpha-tested cutout.
    pub const ALPHA_TEST: Self = Self(1 << 1);
    /// Renders both faces.
    pub const DOUBLE_SIDED: Self = Self(1 << 2);
    /// Casts shadows.
    pub const SHADOW_CASTER: Self = Self(1 << 3);
    /// Vertex skinning.
    pub const SKINNED: Self = Self(1 << 4);
    /// Animated UVs or parameters.
    pub const ANIMATED: Self = Self(1 << 5);
    /// Blended; drawn after opaque geometry.
    pub const TRANSPARENT: Self = Self(1 << 8);
    /// Emits light.
    pub const EMISSIVE: Self = Self(1 << 9);

    /// Creates flags from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_raw(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Checks if every flag of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Checks if no flag is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl MaskKey for MaterialFlags {
    const BITS: u32 = u32::BITS;

    #[inline]
    fn to_bits(self) -> u64 {
        u64::from(self.0)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_bits(bits: u64) -> Self {
        Self(bits as u32)
    }
}

impl BitOr for MaterialFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MaterialFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for MaterialFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}
