//! Rigid body, collider, and inertia components.

use std::sync::Arc;

use glam::{Mat3, Quat, Vec3};

use crate::error::{PhysicsError, Result};

/// Dynamics state of a node: mass, velocities, and orientation.
///
/// Created on demand by the host (or by
/// [`crate::scene::graph::promote_rigid_body`]) and destroyed along with
/// its owning node. Mutated only by the integrator, the skeleton pass, and
/// the impulse solver.
#[derive(Debug, Clone, Copy)]
pub struct RigidBody {
    pub mass: f32,
    /// Cached `1 / mass`.
    pub inv_mass: f32,
    pub velocity: Vec3,
    /// Angular velocity as a single vector; its length is speed, its
    /// direction the rotation axis.
    pub angular_velocity: Vec3,
    /// Unit orientation quaternion, renormalized every integration step.
    pub orientation: Quat,
    /// World-space position this body is snapped back to when it crosses
    /// the configured death plane.
    pub spawn_point: Vec3,
}

impl RigidBody {
    /// Construct a dynamic body at the given spawn point. Fails if `mass <= 0`.
    pub fn new(mass: f32, spawn_point: Vec3) -> Result<Self> {
        if mass <= 0.0 {
            return Err(PhysicsError::NonPositiveMass(mass));
        }
        Ok(Self {
            mass,
            inv_mass: 1.0 / mass,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            spawn_point,
        })
    }

    /// Reset velocities to zero, e.g. after a death-plane snap.
    pub fn reset_motion(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    /// Decompose [`RigidBody::angular_velocity`] into `(axis, speed)`,
    /// snapping to `(X, 0)` below the 1e-6 threshold to avoid NaNs downstream.
    pub fn axis_speed(&self) -> (Vec3, f32) {
        let speed = self.angular_velocity.length();
        if speed < 1e-6 {
            (Vec3::X, 0.0)
        } else {
            (self.angular_velocity / speed, speed)
        }
    }
}

/// Axis-aligned bounding box. Invariant: `min <= max` componentwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Overlap test with an inclusion slack (see
    /// [`crate::config::PhysicsConfig::broad_phase_epsilon`]).
    pub fn overlaps(&self, other: &Aabb, epsilon: f32) -> bool {
        self.min.x - epsilon <= other.max.x
            && self.max.x + epsilon >= other.min.x
            && self.min.y - epsilon <= other.max.y
            && self.max.y + epsilon >= other.min.y
            && self.min.z - epsilon <= other.max.z
            && self.max.z + epsilon >= other.min.z
    }
}

/// Surface properties governing contact response.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub elasticity: f32,
    pub static_friction: f32,
    pub kinetic_friction: f32,
}

impl Material {
    pub fn new(elasticity: f32, static_friction: f32, kinetic_friction: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&elasticity) {
            return Err(PhysicsError::InvalidElasticity(elasticity));
        }
        if static_friction < kinetic_friction || kinetic_friction < 0.0 {
            return Err(PhysicsError::InvalidFriction {
                static_friction,
                kinetic_friction,
            });
        }
        Ok(Self {
            elasticity,
            static_friction,
            kinetic_friction,
        })
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            elasticity: 0.3,
            static_friction: 0.6,
            kinetic_friction: 0.4,
        }
    }
}

/// A convex hull collider attached to a node.
///
/// World-space caches (`world_vertices`, `world_aabb`, `geometric_center`,
/// `dimensions`) are refreshed only when the owning [`super::transform::DirtyFlags`]
/// say so — see [`crate::scene::collider_cache`].
#[derive(Debug, Clone)]
pub struct Collider {
    /// Unique vertices of the convex hull, in local space. Shared via `Arc`
    /// so many colliders can reference one [`crate::interfaces::MeshLibrary`] entry.
    pub local_vertices: Arc<[Vec3]>,
    /// Local pose relative to the owning node.
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Vec3,
    pub material: Material,
    pub is_static: bool,

    pub world_vertices: Vec<Vec3>,
    pub world_aabb: Aabb,
    pub geometric_center: Vec3,
    pub dimensions: Vec3,
}

impl Collider {
    pub fn new(
        local_vertices: Arc<[Vec3]>,
        position: Vec3,
        scale: Vec3,
        rotation: Vec3,
        material: Material,
        is_static: bool,
    ) -> Result<Self> {
        if local_vertices.is_empty() {
            return Err(PhysicsError::EmptyHull);
        }
        let dimensions = Aabb::from_points(&scaled(&local_vertices, scale)).extent();
        Ok(Self {
            local_vertices,
            position,
            scale,
            rotation,
            material,
            is_static,
            world_vertices: Vec::new(),
            world_aabb: Aabb {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            },
            geometric_center: Vec3::ZERO,
            dimensions,
        })
    }

    /// `v . direction` maximizer over the current world-space vertex cache,
    /// ties broken by first-encountered index.
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let mut best = self.world_vertices[0];
        let mut best_dot = best.dot(direction);
        for v in &self.world_vertices[1..] {
            let d = v.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = *v;
            }
        }
        best
    }
}

fn scaled(points: &[Vec3], scale: Vec3) -> Vec<Vec3> {
    points.iter().map(|p| *p * scale).collect()
}

/// Inverse inertia tensors for a node that owns (or composes) a rigid body.
///
/// `aligned_inverse` is computed once in the node's local, un-rotated frame
/// (see [`crate::scene::inertia`]); `runtime_inverse` is
/// `R * aligned_inverse * R^T / mass`, refreshed whenever rotation changes.
#[derive(Debug, Clone, Copy)]
pub struct Inertia {
    pub aligned_inverse: Mat3,
    pub runtime_inverse: Mat3,
}

impl Inertia {
    pub fn refresh_runtime(&mut self, rotation: Quat, inv_mass: f32) {
        let r = Mat3::from_quat(rotation);
        self.runtime_inverse = r * self.aligned_inverse * r.transpose() * inv_mass;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rigid_body_rejects_nonpositive_mass() {
        assert!(RigidBody::new(0.0, Vec3::ZERO).is_err());
        assert!(RigidBody::new(-1.0, Vec3::ZERO).is_err());
        assert!(RigidBody::new(1.0, Vec3::ZERO).is_ok());
    }

    #[test]
    fn material_rejects_friction_ordering_violation() {
        assert!(Material::new(0.5, 0.2, 0.4).is_err());
        assert!(Material::new(0.5, 0.4, 0.2).is_ok());
    }

    #[test]
    fn aabb_overlap_respects_epsilon() {
        let a = Aabb {
            min: Vec3::ZERO,
            max: Vec3::ONE,
        };
        let b = Aabb {
            min: Vec3::new(1.01, 0.0, 0.0),
            max: Vec3::new(2.0, 1.0, 1.0),
        };
        assert!(!a.overlaps(&b, 0.0));
        assert!(a.overlaps(&b, 0.1));
    }

    #[test]
    fn axis_speed_snaps_small_velocity_to_x_axis() {
        let mut rb = RigidBody::new(1.0, Vec3::ZERO).unwrap();
        rb.angular_velocity = Vec3::new(1e-8, 0.0, 0.0);
        let (axis, speed) = rb.axis_speed();
        assert_eq!(axis, Vec3::X);
        assert_eq!(speed, 0.0);
    }
}
