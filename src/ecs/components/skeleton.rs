//! Skeleton / bone / joint components.

use glam::{Quat, Vec3};

/// Positional and (for `Ball`) orientational restriction a joint enforces
/// between a parent bone's node and a child bone's node.
///
/// `Hinge`, `Rotator`, and `Piston` carry no orientation restriction of
/// their own; they behave exactly like `Free` here. This is a deliberate
/// fidelity choice, not an oversight — see `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Free,
    Ball,
    Hinge,
    Rotator,
    Piston,
}

/// A constraint from a bone to one of its children.
#[derive(Debug, Clone)]
pub struct Joint {
    pub kind: JointKind,
    /// Child bone entity (its `Bone` component holds the controlled node).
    pub child: hecs::Entity,
    /// Anchor point in the parent node's local frame, rotated each tick by
    /// the bone's current orientation delta relative to bind pose.
    pub parent_offset: Vec3,
    /// Bind-time value of `parent_offset`, rotated fresh every tick rather
    /// than accumulated, so drift cannot compound.
    pub original_parent_offset: Vec3,
    /// Radial distance the child must maintain from the anchor.
    pub child_offset_magnitude: f32,
    pub spring_constant: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

/// One node in a skeleton tree. The bone "owns" a node reference (the
/// entity carrying `Transform`/`GlobalTransform`/optionally `RigidBody`)
/// and lists its outgoing joints to child bones.
pub struct Bone {
    pub node: hecs::Entity,
    pub joints: Vec<Joint>,
    /// Node orientation at bind time, used each tick to compute
    /// `delta = current * inverse(bind)`.
    pub bind_orientation: Quat,
}

impl Bone {
    pub fn new(node: hecs::Entity, bind_orientation: Quat) -> Self {
        Self {
            node,
            joints: Vec::new(),
            bind_orientation,
        }
    }
}

/// Marks a `Bone` entity as the root of a skeleton, i.e. the skeleton pass's
/// traversal starting point.
pub struct SkeletonRoot;
