//! Scene graph update: rigid-body integration, pose propagation down
//! the hierarchy, death-plane resets, and node-management operations.

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use hecs::{Entity, World};

use crate::config::PhysicsConfig;
use crate::ecs::components::physics::{Collider, Inertia, RigidBody};
use crate::ecs::components::transform::{Children, GlobalTransform, Parent, Transform};
use crate::error::Result;
use crate::scene::inertia::{aligned_inverse_inertia, compose_group_inverse_inertia};

/// Advance every dynamic body's linear and angular state by `dt`, apply
/// death-plane resets, and propagate world matrices down from the roots.
/// Returns the number of nodes reset this tick.
pub fn update(world: &mut World, config: &PhysicsConfig, dt: f32) -> usize {
    let net_acceleration = config.net_acceleration();

    for (_, (transform, body)) in world.query_mut::<(&mut Transform, &mut RigidBody)>() {
        body.velocity += net_acceleration * dt;
        transform.set_position(transform.position + body.velocity * dt);
        integrate_orientation(body, transform.rotation, dt);
        transform.set_rotation(orientation_to_transform_euler(body.orientation));
    }

    let mut reset_nodes = 0;
    for (entity, (transform, body)) in world.query_mut::<(&mut Transform, &mut RigidBody)>() {
        if transform.position.y < config.death_plane {
            tracing::debug!(?entity, spawn_point = ?body.spawn_point, "node crossed death plane, resetting");
            transform.set_position(body.spawn_point);
            body.reset_motion();
            reset_nodes += 1;
        }
    }

    recompute_global_transforms(world);
    reset_nodes
}

/// Re-derive `body.orientation` from the node's stored Euler transform before
/// applying this tick's angular-velocity delta, rather than letting the
/// quaternion free-run across ticks. This bounds the gimbal/normalization
/// drift a quaternion-only integration would otherwise accumulate.
fn integrate_orientation(body: &mut RigidBody, stored_euler: Vec3, dt: f32) {
    body.orientation = transform_euler_to_orientation(stored_euler);
    let (axis, speed) = body.axis_speed();
    if speed > 0.0 {
        let delta = Quat::from_axis_angle(axis, speed * dt);
        body.orientation = (delta * body.orientation).normalize();
    }
}

/// Invert the negated-axis convention (see
/// [`crate::ecs::components::transform::compose_model_matrix`]) so a
/// standard orientation quaternion round-trips into stored Euler angles.
fn orientation_to_transform_euler(orientation: Quat) -> Vec3 {
    let (x, y, z) = orientation.to_euler(EulerRot::XYZ);
    Vec3::new(-x, -y, -z)
}

/// Inverse of [`orientation_to_transform_euler`]: rebuild the standard
/// orientation quaternion that the node's negated-axis Euler transform represents.
fn transform_euler_to_orientation(stored_euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, -stored_euler.x, -stored_euler.y, -stored_euler.z)
}

/// Recompute [`GlobalTransform`] for every node, walking down from roots
/// (nodes without a [`Parent`]).
pub fn recompute_global_transforms(world: &mut World) {
    let roots: Vec<Entity> = world
        .query::<&Transform>()
        .without::<&Parent>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();

    for root in roots {
        propagate(world, root, Mat4::IDENTITY);
    }
}

fn propagate(world: &mut World, entity: Entity, parent_global: Mat4) {
    let local = match world.get::<&Transform>(entity) {
        Ok(transform) => transform.local_matrix(),
        Err(_) => return,
    };
    let global = parent_global * local;
    if let Ok(mut cached) = world.get::<&mut GlobalTransform>(entity) {
        cached.0 = global;
    }

    let children = world
        .get::<&Children>(entity)
        .map(|children| children.0.clone())
        .unwrap_or_default();
    for child in children {
        propagate(world, child, global);
    }
}

/// Spawn a childless node with no collision geometry.
pub fn create_leaf(world: &mut World, transform: Transform) -> Entity {
    world.spawn((transform, GlobalTransform::default()))
}

/// Spawn a node that can parent other nodes.
pub fn create_group(world: &mut World, transform: Transform) -> Entity {
    world.spawn((transform, GlobalTransform::default(), Children::default()))
}

/// Create a leaf and attach it under `parent`.
pub fn add_leaf(world: &mut World, parent: Entity, transform: Transform) -> Entity {
    let child = create_leaf(world, transform);
    attach(world, parent, child);
    child
}

/// Create a group and attach it under `parent`.
pub fn add_group(world: &mut World, parent: Entity, transform: Transform) -> Entity {
    let child = create_group(world, transform);
    attach(world, parent, child);
    child
}

fn attach(world: &mut World, parent: Entity, child: Entity) {
    let _ = world.insert_one(child, Parent(parent));
    let needs_children_component = world.get::<&mut Children>(parent).is_err();
    if needs_children_component {
        let _ = world.insert_one(parent, Children(vec![child]));
    } else if let Ok(mut children) = world.get::<&mut Children>(parent) {
        children.0.push(child);
    }
}

/// Strip [`RigidBody`] and [`Inertia`] from `root` and every descendant,
/// recursively. Collision geometry and hierarchy are left untouched.
pub fn remove_physics_bodies(world: &mut World, root: Entity) {
    let _ = world.remove_one::<RigidBody>(root);
    let _ = world.remove_one::<Inertia>(root);

    let children = world
        .get::<&Children>(root)
        .map(|children| children.0.clone())
        .unwrap_or_default();
    for child in children {
        remove_physics_bodies(world, child);
    }
}

fn find_subtree_root(world: &World, mut entity: Entity) -> Entity {
    loop {
        let parent = match world.get::<&Parent>(entity) {
            Ok(parent) => parent.0,
            Err(_) => break,
        };
        entity = parent;
    }
    entity
}

/// Gather `(inverse inertia, offset from `node`)` pairs for every child of
/// `node`, recursing into child groups (composing their own inertia first)
/// so a `Group` with no `Collider` of its own still gets a meaningful inverse
/// inertia via the parallel-axis theorem.
fn gather_child_inertia(world: &World, node: Entity, node_position: Vec3) -> Vec<(Mat3, Vec3)> {
    let children = world.get::<&Children>(node).map(|children| children.0.clone()).unwrap_or_default();

    let mut result = Vec::with_capacity(children.len());
    for child in children {
        let child_position = world.get::<&Transform>(child).map(|transform| transform.position).unwrap_or(node_position);
        let offset = child_position - node_position;

        if let Ok(collider) = world.get::<&Collider>(child) {
            result.push((aligned_inverse_inertia(&collider.local_vertices), offset));
        } else {
            let grandchildren = gather_child_inertia(world, child, child_position);
            if !grandchildren.is_empty() {
                result.push((compose_group_inverse_inertia(&grandchildren), offset));
            }
        }
    }
    result
}

/// Make `node` the active rigid body for its connected sub-tree.
///
/// A sub-tree may carry at most one active rigid body. Promoting a
/// node first clears any existing body anywhere in the sub-tree, so the new
/// body is always the only one.
pub fn promote_rigid_body(world: &mut World, node: Entity, mass: f32) -> Result<()> {
    let root = find_subtree_root(world, node);
    remove_physics_bodies(world, root);

    let spawn_point = world
        .get::<&Transform>(node)
        .map(|transform| transform.position)
        .unwrap_or(Vec3::ZERO);
    let body = RigidBody::new(mass, spawn_point)?;

    let aligned_inverse = match world.get::<&Collider>(node) {
        Ok(collider) => aligned_inverse_inertia(&collider.local_vertices),
        Err(_) => {
            let children = gather_child_inertia(world, node, spawn_point);
            if children.is_empty() {
                Mat3::IDENTITY
            } else {
                compose_group_inverse_inertia(&children)
            }
        }
    };
    let mut inertia = Inertia {
        aligned_inverse,
        runtime_inverse: Mat3::ZERO,
    };
    inertia.refresh_runtime(body.orientation, body.inv_mass);

    let _ = world.insert(node, (body, inertia));
    Ok(())
}
