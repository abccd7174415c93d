//! World-space transform cache for colliders.
//!
//! Position, scale, and rotation changes set dirty flags on the owning
//! node's [`Transform`]; this module is the single place that reads those
//! flags and decides exactly which cached quantity needs recomputation.
//! The flush batches every dirty collider into one [`Transformer`] call
//! and runs exactly once per tick, right before broad phase.

use glam::{EulerRot, Mat4, Vec3};

use crate::ecs::components::physics::{Aabb, Collider, Inertia};
use crate::ecs::components::transform::{compose_model_matrix, DirtyFlags, GlobalTransform};
use crate::interfaces::{Transformer, TransformRequest};
use crate::scene::inertia::aligned_inverse_inertia;

/// World-space pose of a collider: the owning node's world matrix composed
/// with the collider's own local offset, decomposed back to
/// position/rotation/scale for the [`Transformer`] contract.
fn collider_world_pose(global: Mat4, collider: &Collider) -> (Vec3, Vec3, Vec3) {
    let local = compose_model_matrix(collider.position, collider.rotation, collider.scale);
    let combined = global * local;
    let (scale, quat, position) = combined.to_scale_rotation_translation();
    let (ex, ey, ez) = quat.to_euler(EulerRot::XYZ);
    (position, Vec3::new(-ex, -ey, -ez), scale)
}

/// Flush every dirty collider's world-space cache, batched through one
/// [`Transformer::transform`] call. Returns the number of colliders refreshed.
pub fn flush_dirty_colliders(
    world: &mut hecs::World,
    transformer: &dyn Transformer,
) -> usize {
    // Entities whose collider needs a full vertex recompute (rotation/scale dirty).
    let mut needs_vertices: Vec<hecs::Entity> = Vec::new();
    // Entities that only moved (position dirty, nothing else) — cheap shift.
    let mut needs_shift: Vec<hecs::Entity> = Vec::new();

    for (entity, (transform, collider)) in world
        .query::<(&crate::ecs::components::transform::Transform, &Collider)>()
        .iter()
    {
        if transform.dirty.contains(DirtyFlags::ROTATION) || transform.dirty.contains(DirtyFlags::SCALE) {
            needs_vertices.push(entity);
        } else if transform.dirty.contains(DirtyFlags::POSITION) && !collider.world_vertices.is_empty() {
            needs_shift.push(entity);
        } else if collider.world_vertices.is_empty() {
            // First-ever flush: always needs a full recompute.
            needs_vertices.push(entity);
        }
    }

    let refreshed = needs_vertices.len() + needs_shift.len();

    if !needs_vertices.is_empty() {
        let mut owned_vertices = Vec::with_capacity(needs_vertices.len());
        let mut poses = Vec::with_capacity(needs_vertices.len());
        for &entity in &needs_vertices {
            let global = world.get::<&GlobalTransform>(entity).map(|g| g.0).unwrap_or(Mat4::IDENTITY);
            let collider = world.get::<&Collider>(entity).unwrap();
            owned_vertices.push(collider.local_vertices.clone());
            poses.push(collider_world_pose(global, &collider));
        }
        let batch: Vec<TransformRequest<'_>> = owned_vertices
            .iter()
            .zip(poses.iter())
            .map(|(verts, (position, rotation, scale))| TransformRequest {
                local_vertices: verts,
                position: *position,
                rotation: *rotation,
                scale: *scale,
            })
            .collect();
        let results = transformer.transform(&batch);

        for (entity, world_vertices) in needs_vertices.iter().zip(results.into_iter()) {
            let rotation_dirty;
            let scale_dirty;
            {
                let transform = world.get::<&crate::ecs::components::transform::Transform>(*entity).unwrap();
                rotation_dirty = transform.dirty.contains(DirtyFlags::ROTATION);
                scale_dirty = transform.dirty.contains(DirtyFlags::SCALE);
            }
            let mut collider = world.get::<&mut Collider>(*entity).unwrap();
            collider.world_aabb = Aabb::from_points(&world_vertices);
            collider.geometric_center = collider.world_aabb.center();
            if scale_dirty {
                collider.dimensions = Aabb::from_points(
                    &collider
                        .local_vertices
                        .iter()
                        .map(|v| *v * collider.scale)
                        .collect::<Vec<_>>(),
                )
                .extent();
            }
            collider.world_vertices = world_vertices;
            drop(collider);

            if rotation_dirty {
                if let Ok(mut inertia) = world.get::<&mut Inertia>(*entity) {
                    let local_vertices = world.get::<&Collider>(*entity).unwrap().local_vertices.clone();
                    inertia.aligned_inverse = aligned_inverse_inertia(&local_vertices);
                    let (orientation, inv_mass) = world
                        .get::<&crate::ecs::components::physics::RigidBody>(*entity)
                        .map(|rb| (rb.orientation, rb.inv_mass))
                        .unwrap_or((glam::Quat::IDENTITY, 0.0));
                    inertia.refresh_runtime(orientation, inv_mass);
                }
            }
        }
    }

    for &entity in &needs_shift {
        let global = world.get::<&GlobalTransform>(entity).map(|g| g.0).unwrap_or(Mat4::IDENTITY);
        let mut collider = world.get::<&mut Collider>(entity).unwrap();
        // Position-only change: shift the cached vertices/AABB by the delta
        // rather than re-running the full transform batch.
        let local = compose_model_matrix(collider.position, collider.rotation, collider.scale);
        let new_center = (global * local).transform_point3(Vec3::ZERO);
        let shift = new_center - collider.geometric_center;
        for v in collider.world_vertices.iter_mut() {
            *v += shift;
        }
        collider.world_aabb = Aabb {
            min: collider.world_aabb.min + shift,
            max: collider.world_aabb.max + shift,
        };
        collider.geometric_center += shift;
    }

    for &entity in needs_vertices.iter().chain(needs_shift.iter()) {
        if let Ok(mut transform) = world.get::<&mut crate::ecs::components::transform::Transform>(entity) {
            transform.dirty = DirtyFlags::empty();
        }
    }

    refreshed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::Material;
    use crate::ecs::components::transform::Transform;
    use crate::interfaces::CpuTransformer;
    use std::sync::Arc;

    fn cube_vertices() -> Arc<[Vec3]> {
        Arc::from(vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ])
    }

    #[test]
    fn first_flush_populates_world_vertices() {
        let mut world = hecs::World::new();
        let collider = Collider::new(
            cube_vertices(),
            Vec3::ZERO,
            Vec3::ONE,
            Vec3::ZERO,
            Material::default(),
            false,
        )
        .unwrap();
        let entity = world.spawn((
            Transform::from_position(Vec3::new(5.0, 0.0, 0.0)),
            GlobalTransform(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0))),
            collider,
        ));

        flush_dirty_colliders(&mut world, &CpuTransformer);

        let collider = world.get::<&Collider>(entity).unwrap();
        assert_eq!(collider.world_vertices.len(), 8);
        assert!((collider.geometric_center - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn position_only_dirty_shifts_without_full_recompute() {
        let mut world = hecs::World::new();
        let collider = Collider::new(
            cube_vertices(),
            Vec3::ZERO,
            Vec3::ONE,
            Vec3::ZERO,
            Material::default(),
            false,
        )
        .unwrap();
        let entity = world.spawn((Transform::identity(), GlobalTransform::default(), collider));
        flush_dirty_colliders(&mut world, &CpuTransformer);

        {
            let mut transform = world.get::<&mut Transform>(entity).unwrap();
            transform.set_position(Vec3::new(2.0, 0.0, 0.0));
            let mut global = world.get::<&mut GlobalTransform>(entity).unwrap();
            global.0 = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        }
        flush_dirty_colliders(&mut world, &CpuTransformer);

        let collider = world.get::<&Collider>(entity).unwrap();
        assert!((collider.geometric_center - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-4);
    }
}
