//! Local pose, world pose cache, and hierarchy components for a scene node.

use bitflags::bitflags;
use glam::{Mat4, Vec3};

bitflags! {
    /// Per-node dirty bits driving exactly which cached quantities get
    /// recomputed during the collider-cache flush (see
    /// [`crate::scene::collider_cache`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        const POSITION = 0b0001;
        const ROTATION = 0b0010;
        const SCALE    = 0b0100;
        const INERTIA  = 0b1000;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        // Everything starts dirty so the first collider-cache flush populates
        // every cached quantity from scratch.
        DirtyFlags::all()
    }
}

/// Local pose of a node relative to its parent (or the world, for roots).
///
/// Rotation is stored as Euler angles, matching the asset format the
/// surrounding engine composes transforms in; it is converted to a
/// quaternion only where integration needs one (see
/// [`crate::scene::graph::integrate_orientation`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    /// Euler angles in radians, engine's `(x, y, z)` order.
    pub rotation: Vec3,
    pub dirty: DirtyFlags,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
            dirty: DirtyFlags::default(),
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty |= DirtyFlags::POSITION;
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.dirty |= DirtyFlags::ROTATION;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty |= DirtyFlags::SCALE;
    }

    /// Compose this pose's local-to-parent matrix.
    ///
    /// Uses the engine's non-standard sign convention: rotation is applied
    /// about the *negated* X/Y/Z axes. This must be preserved bit-exactly
    /// so existing authored scenes keep rendering and colliding the same way.
    pub fn local_matrix(&self) -> Mat4 {
        compose_model_matrix(self.position, self.rotation, self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Compose `T(position) * Rx * Ry * Rz * S(scale)` using the engine's
/// negated-axis rotation convention (`(-1,0,0)`, `(0,-1,0)`, `(0,0,-1)`).
///
/// This is also the pure-CPU fallback body for [`crate::interfaces::Transformer`].
pub fn compose_model_matrix(position: Vec3, rotation_euler: Vec3, scale: Vec3) -> Mat4 {
    let rx = Mat4::from_axis_angle(Vec3::NEG_X, rotation_euler.x);
    let ry = Mat4::from_axis_angle(Vec3::NEG_Y, rotation_euler.y);
    let rz = Mat4::from_axis_angle(Vec3::NEG_Z, rotation_euler.z);
    Mat4::from_translation(position) * rx * ry * rz * Mat4::from_scale(scale)
}

/// Cached local-to-world matrix for a node, refreshed by the scene graph
/// update each time an ancestor's pose changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform(pub Mat4);

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

impl GlobalTransform {
    pub fn position(&self) -> Vec3 {
        self.0.transform_point3(Vec3::ZERO)
    }
}

/// Back-reference to the owning parent node, stored as an ECS entity rather
/// than a raw pointer to avoid ownership cycles in the node tree.
pub struct Parent(pub hecs::Entity);

/// Forward references to child nodes. A node with this component is a
/// group (interior); one without it is a leaf.
#[derive(Default)]
pub struct Children(pub Vec<hecs::Entity>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matrix_is_identity() {
        let t = Transform::identity();
        assert_eq!(t.local_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn negated_axis_convention_flips_sign_of_rotation() {
        let angle = std::f32::consts::FRAC_PI_2;
        let negated = compose_model_matrix(Vec3::ZERO, Vec3::new(angle, 0.0, 0.0), Vec3::ONE);
        let standard = Mat4::from_rotation_x(-angle);
        let eps = 1e-5;
        for (a, b) in negated.to_cols_array().iter().zip(standard.to_cols_array()) {
            assert!((a - b).abs() < eps);
        }
    }

    #[test]
    fn set_position_marks_position_dirty_only() {
        let mut t = Transform::identity();
        t.dirty = DirtyFlags::empty();
        t.set_position(Vec3::ONE);
        assert_eq!(t.dirty, DirtyFlags::POSITION);
    }
}
