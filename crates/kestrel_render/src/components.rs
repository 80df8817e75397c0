//! Render components attached to drawable entities.

use kestrel_core::{Component, Handle};

use crate::material::MaterialFlags;

/// World transform: translation, rotation quaternion `[x, y, z, w]` and
/// non-uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation.
    pub position: [f32; 3],
    /// Unit quaternion `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Per-axis scale.
    pub scale: [f32; 3],
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    /// Translation only.
    #[must_use]
    pub const fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            ..Self::IDENTITY
        }
    }

    /// Sets a uniform scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: f32) -> Self {
        self.scale = [scale; 3];
        self
    }

    /// Column-major model matrix (scale, then rotate, then translate).
    #[must_use]
    pub fn matrix(&self) -> [[f32; 4]; 4] {
        let [x, y, z, w] = self.rotation;
        let [sx, sy, sz] = self.scale;
        let [tx, ty, tz] = self.position;

        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);

        [
            [(1.0 - 2.0 * (yy + zz)) * sx, 2.0 * (xy + wz) * sx, 2.0 * (xz - wy) * sx, 0.0],
            [2.0 * (xy - wz) * sy, (1.0 - 2.0 * (xx + zz)) * sy, 2.0 * (yz + wx) * sy, 0.0],
            [2.0 * (xz + wy) * sz, 2.0 * (yz - wx) * sz, (1.0 - 2.0 * (xx + yy)) * sz, 0.0],
            [tx, ty, tz, 1.0],
        ]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {}

/// Vertex buffer of the entity's mesh, in [`GpuResources`](crate::GpuResources).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshRef(pub Handle);

impl Component for MeshRef {}

/// Pipeline and flags of the entity's material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialRef {
    /// Pipeline in [`GpuResources`](crate::GpuResources).
    pub pipeline: Handle,
    /// Batch key.
    pub flags: MaterialFlags,
}

impl Component for MaterialRef {}

/// Marker: the entity is not drawn while it has this component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hidden;

impl Component for Hidden {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        let m = Transform::IDENTITY.matrix();
        for (col, column) in m.iter().enumerate() {
            for (row, value) in column.iter().enumerate() {
                let expected = if col == row { 1.0 } else { 0.0 };
                assert!((value - expected).abs() < f32::EPSILON);
            }
        }
    }

    #[test]
    fn test_translation_and_scale() {
        let m = Transform::from_position(1.0, 2.0, 3.0).with_scale(2.0).matrix();
        assert_eq!(m[3], [1.0, 2.0, 3.0, 1.0]);
        assert!((m[0][0] - 2.0).abs() < f32::EPSILON);
        assert!((m[1][1] - 2.0).abs() < f32::EPSILON);
        assert!((m[2][2] - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let transform = Transform {
            rotation: [0.0, 0.0, half, half],
            ..Transform::IDENTITY
        };
        let m = transform.matrix();
        // X axis maps to Y.
        assert!(m[0][0].abs() < 1e-6);
        assert!((m[0][1] - 1.0).abs() < 1e-6);
    }
}
