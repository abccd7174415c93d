//! Skeleton/joint resolution, run once per tick after the scene
//! graph update and before any collision work.
//!
//! Bones form a tree through `Joint::child` links starting at each
//! [`SkeletonRoot`]; a bone's outgoing joints are resolved before its
//! children's, since a child's anchor depends on its parent's refreshed
//! `parent_offset`.

use glam::{Quat, Vec3};
use hecs::Entity;

use crate::ecs::components::physics::RigidBody;
use crate::ecs::components::skeleton::{Bone, JointKind, SkeletonRoot};
use crate::ecs::components::transform::Transform;

/// Fallback axis used when a ball joint's rotation axis degenerates (the
/// current and desired forward directions are parallel).
const DEGENERATE_AXIS_FALLBACK: Vec3 = Vec3::Y;

pub fn resolve(world: &hecs::World, dt: f32) {
    let roots: Vec<Entity> = world.query::<&SkeletonRoot>().iter().map(|(entity, _)| entity).collect();
    for root in roots {
        resolve_bone_recursive(world, root, dt);
    }
}

fn resolve_bone_recursive(world: &hecs::World, bone_entity: Entity, dt: f32) {
    if world.get::<&Bone>(bone_entity).is_err() {
        return;
    }
    let children = resolve_bone(world, bone_entity, dt);
    for child in children {
        resolve_bone_recursive(world, child, dt);
    }
}

/// Resolve one bone's joints, returning the joint children for recursion.
fn resolve_bone(world: &hecs::World, bone_entity: Entity, dt: f32) -> Vec<Entity> {
    let (node, bind_orientation, joint_count) = {
        let bone = world.get::<&Bone>(bone_entity).unwrap();
        (bone.node, bone.bind_orientation, bone.joints.len())
    };

    let current_orientation = world.get::<&RigidBody>(node).map(|body| body.orientation).unwrap_or(Quat::IDENTITY);
    let delta_q = current_orientation * bind_orientation.inverse();
    let parent_position = world.get::<&Transform>(node).map(|t| t.position).unwrap_or(Vec3::ZERO);
    let parent_has_body = world.get::<&RigidBody>(node).is_ok();

    let mut children = Vec::with_capacity(joint_count);
    for i in 0..joint_count {
        let (kind, child, original_offset, rest_length, spring_constant) = {
            let bone = world.get::<&Bone>(bone_entity).unwrap();
            let joint = &bone.joints[i];
            (joint.kind, joint.child, joint.original_parent_offset, joint.child_offset_magnitude, joint.spring_constant)
        };

        let parent_offset = delta_q * original_offset;
        if let Ok(mut bone) = world.get::<&mut Bone>(bone_entity) {
            bone.joints[i].parent_offset = parent_offset;
        }

        resolve_joint(world, kind, child, parent_position + parent_offset, original_offset, rest_length, spring_constant, parent_has_body, dt);
        children.push(child);
    }
    children
}

fn resolve_joint(
    world: &hecs::World,
    kind: JointKind,
    child: Entity,
    anchor: Vec3,
    original_parent_offset: Vec3,
    rest_length: f32,
    spring_constant: f32,
    parent_has_body: bool,
    dt: f32,
) {
    let has_child_body = world.get::<&RigidBody>(child).is_ok();

    if has_child_body {
        resolve_spring(world, child, anchor, rest_length, spring_constant, parent_has_body, dt);
    } else if let Ok(mut transform) = world.get::<&mut Transform>(child) {
        let offset = transform.position - anchor;
        let length = offset.length();
        let direction = if length > 1e-6 { offset / length } else { Vec3::Y };
        let snapped = anchor + direction * rest_length;
        transform.set_position(snapped);
    }

    if matches!(kind, JointKind::Ball) {
        align_ball_orientation(world, child, anchor, original_parent_offset);
    }
}

/// Damped-spring resolution: `F = -k·direction·(r - r0) - 2*sqrt(k*m)*v`,
/// halved when both endpoints carry a rigid body, integrated as Euler.
fn resolve_spring(world: &hecs::World, child: Entity, anchor: Vec3, rest_length: f32, spring_constant: f32, parent_has_body: bool, dt: f32) {
    let (position, velocity, mass, inv_mass) = {
        let body = world.get::<&RigidBody>(child).unwrap();
        let transform = world.get::<&Transform>(child).map(|t| t.position).unwrap_or(anchor);
        (transform, body.velocity, body.mass, body.inv_mass)
    };

    let offset = position - anchor;
    let length = offset.length();
    let direction = if length > 1e-6 { offset / length } else { Vec3::Y };

    let damping = 2.0 * (spring_constant * mass).sqrt();
    let mut force = -spring_constant * direction * (length - rest_length) - damping * velocity;
    if parent_has_body {
        force *= 0.5;
    }

    let mut body = world.get::<&mut RigidBody>(child).unwrap();
    body.velocity += force * inv_mass * dt;
    let delta = body.velocity * dt;
    drop(body);

    if let Ok(mut transform) = world.get::<&mut Transform>(child) {
        let new_position = transform.position + delta;
        transform.set_position(new_position);
    }
}

/// Align the child's bind-frame forward axis to point from the child toward
/// the anchor. The forward axis is derived from this joint's own bind-time
/// geometry (the child's bind orientation applied to the negated
/// `original_parent_offset`), not a crate-wide constant — two joints with
/// different bind poses have different forward axes.
fn align_ball_orientation(world: &hecs::World, child: Entity, anchor: Vec3, original_parent_offset: Vec3) {
    let Ok(mut body) = world.get::<&mut RigidBody>(child) else {
        return;
    };
    let position = world.get::<&Transform>(child).map(|t| t.position).unwrap_or(anchor);
    let desired_forward = (anchor - position).try_normalize().unwrap_or(Vec3::Y);

    let child_bind_orientation = world.get::<&Bone>(child).map(|bone| bone.bind_orientation).unwrap_or(Quat::IDENTITY);
    let bind_forward_axis = (child_bind_orientation * -original_parent_offset).try_normalize().unwrap_or(Vec3::Y);
    let current_forward = (body.orientation * bind_forward_axis).normalize();

    let axis = current_forward.cross(desired_forward);
    let axis_len = axis.length();
    let angle = current_forward.dot(desired_forward).clamp(-1.0, 1.0).acos();
    let rotation_axis = if axis_len < 1e-6 { DEGENERATE_AXIS_FALLBACK } else { axis / axis_len };

    body.orientation = (Quat::from_axis_angle(rotation_axis, angle) * body.orientation).normalize();
}
