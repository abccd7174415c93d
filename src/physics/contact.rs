//! Contact resolution: position correction by mass class, then a
//! sequential impulse pair with combined elasticity and Coulomb friction.

use glam::{Mat3, Quat, Vec3};
use hecs::Entity;

use crate::ecs::components::physics::{Inertia, Material, RigidBody};
use crate::ecs::components::transform::Transform;

/// Normal, penetration depth, and world-space point produced by narrow phase.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Unit normal pointing from collider A to collider B.
    pub normal: Vec3,
    pub depth: f32,
    pub point: Vec3,
}

struct BodyView {
    position: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
    inv_mass: f32,
    inv_inertia: Mat3,
}

fn body_view(world: &hecs::World, entity: Entity) -> BodyView {
    let position = world.get::<&Transform>(entity).map(|t| t.position).unwrap_or(Vec3::ZERO);
    match world.get::<&RigidBody>(entity) {
        Ok(body) => {
            let inv_inertia = world.get::<&Inertia>(entity).map(|i| i.runtime_inverse).unwrap_or(Mat3::ZERO);
            BodyView {
                position,
                velocity: body.velocity,
                angular_velocity: body.angular_velocity,
                inv_mass: body.inv_mass,
                inv_inertia,
            }
        }
        Err(_) => BodyView {
            position,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            inv_mass: 0.0,
            inv_inertia: Mat3::ZERO,
        },
    }
}

/// Separate overlapping colliders along the contact normal, split by mass class.
pub fn correct_positions(world: &hecs::World, a: Entity, b: Entity, contact: &ContactInfo, static_a: bool, static_b: bool) {
    match (static_a, static_b) {
        (true, true) => {}
        (true, false) => shift(world, b, contact.normal * contact.depth),
        (false, true) => shift(world, a, contact.normal * -contact.depth),
        (false, false) => {
            shift(world, a, contact.normal * -contact.depth * 0.5);
            shift(world, b, contact.normal * contact.depth * 0.5);
        }
    }
}

fn shift(world: &hecs::World, entity: Entity, delta: Vec3) {
    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        let new_position = transform.position + delta;
        transform.set_position(new_position);
    }
}

fn round_to_millis(v: Vec3) -> Vec3 {
    Vec3::new(round_step(v.x), round_step(v.y), round_step(v.z))
}

fn round_step(x: f32) -> f32 {
    (x / 1e-3).round() * 1e-3
}

/// Apply the sequential-impulse pair for one contact point. `contact_count`
/// divides the impulse when a pair reports more than one contact point.
/// Returns `true` if an impulse was applied (neither separating nor both-static).
pub fn apply_impulse(
    world: &hecs::World,
    a: Entity,
    b: Entity,
    contact: &ContactInfo,
    material_a: Material,
    material_b: Material,
    contact_count: usize,
    tangent_velocity_epsilons: (f32, f32),
) -> bool {
    let body_a = body_view(world, a);
    let body_b = body_view(world, b);
    if body_a.inv_mass == 0.0 && body_b.inv_mass == 0.0 {
        return false;
    }

    let n = contact.normal;
    let r_a = contact.point - body_a.position;
    let r_b = contact.point - body_b.position;

    let v_rel = (body_a.velocity + body_a.angular_velocity.cross(r_a)) - (body_b.velocity + body_b.angular_velocity.cross(r_b));
    let v_n = v_rel.dot(n);
    if v_n > 0.0 {
        return false;
    }

    let k = body_a.inv_mass
        + body_b.inv_mass
        + n.dot((body_a.inv_inertia * r_a.cross(n)).cross(r_a))
        + n.dot((body_b.inv_inertia * r_b.cross(n)).cross(r_b));
    if k <= 0.0 {
        return false;
    }

    let e = material_a.elasticity.max(material_b.elasticity);
    let j_n = -(1.0 + e) * v_n / k;
    let j = n * j_n;

    let v_t = v_rel - n * v_rel.dot(n);
    let speed_t = v_t.length();
    let (no_friction, kinetic_threshold) = tangent_velocity_epsilons;
    let jf = if speed_t < no_friction {
        Vec3::ZERO
    } else if speed_t < kinetic_threshold {
        let mu_s = material_a.static_friction.min(material_b.static_friction);
        -mu_s * j.length() * (v_t / speed_t)
    } else {
        let mu_k = material_a.kinetic_friction.min(material_b.kinetic_friction);
        -mu_k * j.length() * (v_t / speed_t)
    };

    let j_total = round_to_millis(j + jf) / contact_count.max(1) as f32;

    apply_to_body(world, a, -1.0, j_total, r_a);
    apply_to_body(world, b, 1.0, j_total, r_b);
    true
}

fn apply_to_body(world: &hecs::World, entity: Entity, sign: f32, j_total: Vec3, r: Vec3) {
    let Ok(mut body) = world.get::<&mut RigidBody>(entity) else {
        return;
    };
    if body.inv_mass == 0.0 {
        return;
    }
    let inv_mass = body.inv_mass;
    body.velocity += sign * j_total * inv_mass;

    let inv_inertia = world.get::<&Inertia>(entity).map(|i| i.runtime_inverse).unwrap_or(Mat3::ZERO);
    let delta_omega = inv_inertia * r.cross(sign * j_total);
    let omega_vec = body.angular_velocity + delta_omega;
    body.angular_velocity = if omega_vec.length() < 1e-6 { Vec3::ZERO } else { omega_vec };
}

/// Refresh [`Inertia::runtime_inverse`] for an entity after its orientation changed.
pub fn refresh_runtime_inertia(world: &hecs::World, entity: Entity) {
    let Ok(body) = world.get::<&RigidBody>(entity) else {
        return;
    };
    let orientation: Quat = body.orientation;
    let inv_mass = body.inv_mass;
    drop(body);
    if let Ok(mut inertia) = world.get::<&mut Inertia>(entity) {
        inertia.refresh_runtime(orientation, inv_mass);
    }
}
