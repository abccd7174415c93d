//! End-to-end scenarios and seeded property checks for the physics pipeline.

use std::sync::Arc;

use glam::{Mat3, Quat, Vec3};
use rigidgraph::ecs::components::skeleton::{Bone, Joint, JointKind, SkeletonRoot};
use rigidgraph::physics::broadphase::Bvh;
use rigidgraph::physics::contact::{apply_impulse, correct_positions, ContactInfo};
use rigidgraph::physics::narrowphase::gjk;
use rigidgraph::{Aabb, Collider, GlobalTransform, Inertia, Material, PhysicsConfig, PhysicsWorld, RigidBody, Transform};

/// Small deterministic xorshift generator standing in for a `rand` crate
/// dependency: every property check below iterates a fixed, seeded sequence
/// rather than drawing from the OS RNG, so a failure always reproduces.
struct Xorshift32(u32);

impl Xorshift32 {
    fn new(seed: u32) -> Self {
        Self(if seed == 0 { 0x9e3779b9 } else { seed })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform float in `[lo, hi)`.
    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        let unit = (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32;
        lo + unit * (hi - lo)
    }

    fn vec3(&mut self, lo: f32, hi: f32) -> Vec3 {
        Vec3::new(self.range(lo, hi), self.range(lo, hi), self.range(lo, hi))
    }
}

/// Points approximating a sphere of the given radius via a Fibonacci
/// lattice, used as a convex-hull stand-in for round bodies in the GJK
/// round-trip check below.
fn fibonacci_sphere(count: usize, radius: f32) -> Vec<Vec3> {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32) / ((count - 1).max(1) as f32);
            let radius_at_y = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            Vec3::new(theta.cos() * radius_at_y, y, theta.sin() * radius_at_y) * radius
        })
        .collect()
}

fn sphere_collider(center: Vec3, radius: f32) -> Collider {
    let verts: Arc<[Vec3]> = Arc::from(fibonacci_sphere(162, radius));
    let mut collider = Collider::new(verts, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Material::default(), false).unwrap();
    collider.world_vertices = collider.local_vertices.to_vec();
    for v in &mut collider.world_vertices {
        *v += center;
    }
    collider.geometric_center = center;
    collider.world_aabb = Aabb::from_points(&collider.world_vertices);
    collider
}

fn cube_vertices(half_extent: f32) -> Arc<[Vec3]> {
    let h = half_extent;
    Arc::from(vec![
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(-h, h, h),
        Vec3::new(h, h, h),
    ])
}

fn spawn_dynamic_cube(world: &mut hecs::World, position: Vec3, half_extent: f32, material: Material) -> hecs::Entity {
    let collider = Collider::new(cube_vertices(half_extent), Vec3::ZERO, Vec3::ONE, Vec3::ZERO, material, false).unwrap();
    world.spawn((
        Transform::from_position(position),
        GlobalTransform::default(),
        collider,
        RigidBody::new(1.0, position).unwrap(),
    ))
}

fn spawn_static_box(world: &mut hecs::World, position: Vec3, scale: Vec3) -> hecs::Entity {
    let collider = Collider::new(cube_vertices(1.0), Vec3::ZERO, scale, Vec3::ZERO, Material::default(), true).unwrap();
    world.spawn((Transform::from_position(position), GlobalTransform::default(), collider))
}

#[test]
fn free_fall() {
    let mut world = hecs::World::new();
    spawn_dynamic_cube(&mut world, Vec3::new(0.0, 10.0, 0.0), 1.0, Material::default());

    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    for _ in 0..60 {
        physics.step(&mut world, 1.0 / 60.0);
    }

    let mut query = world.query::<&Transform>();
    let (_, transform) = query.iter().next().unwrap();
    let expected = 10.0 - 0.5 * 9.8;
    assert!((transform.position.y - expected).abs() < 0.05, "y = {}", transform.position.y);
}

#[test]
fn rest_on_plane() {
    let mut world = hecs::World::new();
    spawn_static_box(&mut world, Vec3::new(0.0, -4.0, 0.0), Vec3::new(10.0, 1.0, 10.0));
    let cube = spawn_dynamic_cube(&mut world, Vec3::new(0.0, 5.0, 0.0), 1.0, Material::new(0.1, 0.6, 0.4).unwrap());

    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    for _ in 0..300 {
        physics.step(&mut world, 1.0 / 60.0);
    }

    let body = world.get::<&RigidBody>(cube).unwrap();
    let transform = world.get::<&Transform>(cube).unwrap();
    assert!(body.velocity.y.abs() < 0.1, "velocity.y = {}", body.velocity.y);
    assert!((transform.position.y - (-2.0)).abs() < 0.05, "y = {}", transform.position.y);
}

#[test]
fn elastic_bounce_preserves_most_of_the_drop_height() {
    let mut world = hecs::World::new();
    spawn_static_box(&mut world, Vec3::new(0.0, -4.0, 0.0), Vec3::new(10.0, 1.0, 10.0));
    let cube = spawn_dynamic_cube(&mut world, Vec3::new(0.0, 5.0, 0.0), 1.0, Material::new(1.0, 0.0, 0.0).unwrap());

    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    let mut was_falling = false;
    let mut peak_after_bounce = f32::MIN;
    let mut bounced = false;

    for _ in 0..600 {
        physics.step(&mut world, 1.0 / 60.0);
        let body = world.get::<&RigidBody>(cube).unwrap();
        let y = world.get::<&Transform>(cube).unwrap().position.y;

        if was_falling && body.velocity.y > 0.0 {
            bounced = true;
        }
        was_falling = body.velocity.y < 0.0;

        if bounced {
            peak_after_bounce = peak_after_bounce.max(y);
            if body.velocity.y < 0.0 && y < peak_after_bounce {
                break;
            }
        }
    }

    assert!(bounced, "cube never bounced off the floor");
    assert!(peak_after_bounce >= 4.9, "peak height after bounce = {}", peak_after_bounce);
}

#[test]
fn separating_pair_produces_no_contacts() {
    let mut world = hecs::World::new();
    spawn_dynamic_cube(&mut world, Vec3::ZERO, 1.0, Material::default());
    spawn_dynamic_cube(&mut world, Vec3::new(50.0, 0.0, 0.0), 1.0, Material::default());

    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    let report = physics.step(&mut world, 1.0 / 60.0);
    assert_eq!(report.resolved_contacts, 0);
}

#[test]
fn stacked_cubes_settle_with_unit_spacing() {
    let mut world = hecs::World::new();
    spawn_static_box(&mut world, Vec3::new(0.0, -4.0, 0.0), Vec3::new(10.0, 1.0, 10.0));
    let half = 0.5;
    let material = Material::new(0.1, 0.6, 0.4).unwrap();
    let bottom = spawn_dynamic_cube(&mut world, Vec3::new(0.0, 0.0, 0.0), half, material);
    let middle = spawn_dynamic_cube(&mut world, Vec3::new(0.0, 1.5, 0.0), half, material);
    let top = spawn_dynamic_cube(&mut world, Vec3::new(0.0, 3.0, 0.0), half, material);

    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    for _ in 0..180 {
        physics.step(&mut world, 1.0 / 60.0);
    }

    let y_bottom = world.get::<&Transform>(bottom).unwrap().position.y;
    let y_middle = world.get::<&Transform>(middle).unwrap().position.y;
    let y_top = world.get::<&Transform>(top).unwrap().position.y;

    assert!(y_bottom <= y_middle + 0.1);
    assert!(y_middle <= y_top + 0.1);
    assert!((y_middle - y_bottom - 1.0).abs() < 0.1, "middle-bottom gap = {}", y_middle - y_bottom);
    assert!((y_top - y_middle - 1.0).abs() < 0.1, "top-middle gap = {}", y_top - y_middle);
}

#[test]
fn ball_joint_pulls_displaced_child_back_to_the_constraint_surface() {
    let mut world = hecs::World::new();
    let parent = world.spawn((Transform::identity(), GlobalTransform::default(), SkeletonRoot));
    let child = world.spawn((
        Transform::from_position(Vec3::new(2.0, 0.0, 0.0)),
        GlobalTransform::default(),
        RigidBody::new(1.0, Vec3::new(2.0, 0.0, 0.0)).unwrap(),
    ));

    world.insert_one(parent, Bone::new(parent, Quat::IDENTITY)).unwrap();
    world.get::<&mut Bone>(parent).unwrap().joints.push(Joint {
        kind: JointKind::Ball,
        child,
        parent_offset: Vec3::ZERO,
        original_parent_offset: Vec3::ZERO,
        child_offset_magnitude: 1.0,
        spring_constant: 1e4,
        min_radius: 0.0,
        max_radius: 1.0,
    });

    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    for _ in 0..60 {
        physics.step(&mut world, 1.0 / 60.0);
    }

    let distance = world.get::<&Transform>(child).unwrap().position.length();
    assert!((distance - 1.0).abs() < 0.05, "distance = {}", distance);
}

#[test]
fn death_plane_reset_leaves_no_node_below_it() {
    let mut world = hecs::World::new();
    spawn_dynamic_cube(&mut world, Vec3::new(0.0, 2.0, 0.0), 1.0, Material::default());

    let mut physics = PhysicsWorld::new(PhysicsConfig { death_plane: 1.0, ..PhysicsConfig::default() });
    for _ in 0..120 {
        physics.step(&mut world, 1.0 / 60.0);
        for (_, transform) in world.query::<&Transform>().iter() {
            assert!(transform.position.y >= physics.config.death_plane);
        }
    }
}

#[test]
fn quaternion_orientation_stays_normalized_across_many_steps() {
    let mut world = hecs::World::new();
    let entity = spawn_dynamic_cube(&mut world, Vec3::new(0.0, 20.0, 0.0), 1.0, Material::default());
    world.get::<&mut RigidBody>(entity).unwrap().angular_velocity = Vec3::new(3.0, 1.5, -2.0);

    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    for _ in 0..600 {
        physics.step(&mut world, 1.0 / 60.0);
        let orientation = world.get::<&RigidBody>(entity).unwrap().orientation;
        assert!((orientation.length() - 1.0).abs() < 1e-3);
    }
}

#[test]
fn impulse_is_symmetric_between_two_dynamic_bodies() {
    let mut world = hecs::World::new();
    let a = spawn_dynamic_cube(&mut world, Vec3::ZERO, 1.0, Material::new(1.0, 0.0, 0.0).unwrap());
    let b = spawn_dynamic_cube(&mut world, Vec3::new(1.5, 0.0, 0.0), 1.0, Material::new(1.0, 0.0, 0.0).unwrap());
    world.get::<&mut RigidBody>(a).unwrap().velocity = Vec3::new(1.0, 0.0, 0.0);
    world.get::<&mut RigidBody>(b).unwrap().velocity = Vec3::new(-1.0, 0.0, 0.0);

    let momentum_before = world.get::<&RigidBody>(a).unwrap().velocity + world.get::<&RigidBody>(b).unwrap().velocity;

    let mut physics = PhysicsWorld::new(PhysicsConfig { accelerations: vec![Vec3::ZERO], ..PhysicsConfig::default() });
    physics.step(&mut world, 1.0 / 60.0);

    let momentum_after = world.get::<&RigidBody>(a).unwrap().velocity + world.get::<&RigidBody>(b).unwrap().velocity;
    assert!((momentum_after - momentum_before).length() < 1e-3);
}

fn kinetic_energy(velocity: Vec3, angular_velocity: Vec3, mass: f32) -> f32 {
    0.5 * mass * velocity.length_squared() + 0.5 * angular_velocity.length_squared()
}

fn dynamic_body_with_unit_inertia(world: &mut hecs::World, position: Vec3, velocity: Vec3, angular_velocity: Vec3) -> hecs::Entity {
    let mut body = RigidBody::new(1.0, position).unwrap();
    body.velocity = velocity;
    body.angular_velocity = angular_velocity;
    let inertia = Inertia {
        aligned_inverse: Mat3::IDENTITY,
        runtime_inverse: Mat3::IDENTITY,
    };
    world.spawn((Transform::from_position(position), GlobalTransform::default(), body, inertia))
}

#[test]
fn perfectly_elastic_frictionless_impulses_never_increase_kinetic_energy() {
    let mut rng = Xorshift32::new(0xC0FFEE);
    let material = Material::new(1.0, 0.0, 0.0).unwrap();

    for _ in 0..500 {
        let mut world = hecs::World::new();
        let pos_a = rng.vec3(-2.0, 2.0);
        let pos_b = pos_a + rng.vec3(-1.0, 1.0);
        let vel_a = rng.vec3(-5.0, 5.0);
        let vel_b = rng.vec3(-5.0, 5.0);
        let ang_a = rng.vec3(-3.0, 3.0);
        let ang_b = rng.vec3(-3.0, 3.0);
        let a = dynamic_body_with_unit_inertia(&mut world, pos_a, vel_a, ang_a);
        let b = dynamic_body_with_unit_inertia(&mut world, pos_b, vel_b, ang_b);

        let normal = rng.vec3(-1.0, 1.0).try_normalize().unwrap_or(Vec3::Y);
        let point = (pos_a + pos_b) * 0.5 + rng.vec3(-0.5, 0.5);
        let contact = ContactInfo { normal, depth: 0.1, point };

        let energy_before = kinetic_energy(vel_a, ang_a, 1.0) + kinetic_energy(vel_b, ang_b, 1.0);
        apply_impulse(&world, a, b, &contact, material, material, 1, (1e-7, 1e-2));

        let body_a = world.get::<&RigidBody>(a).unwrap();
        let body_b = world.get::<&RigidBody>(b).unwrap();
        let energy_after = kinetic_energy(body_a.velocity, body_a.angular_velocity, 1.0) + kinetic_energy(body_b.velocity, body_b.angular_velocity, 1.0);

        assert!(energy_after <= energy_before + 1e-3, "energy grew: {energy_before} -> {energy_after}");
    }
}

#[test]
fn position_correction_never_leaves_a_pair_penetrating_along_its_normal() {
    let mut rng = Xorshift32::new(0xFACADE);

    for _ in 0..500 {
        let mut world = hecs::World::new();
        let pos_a = rng.vec3(-3.0, 3.0);
        let normal = rng.vec3(-1.0, 1.0).try_normalize().unwrap_or(Vec3::X);
        let depth = rng.range(0.01, 1.0);
        // Place `b` so it overlaps `a` by `depth` along `normal`: separation
        // along the normal before correction is `rest - depth` for some
        // rest offset, so after correction it must be >= that rest offset.
        let rest_along_normal = rng.range(0.5, 2.0);
        let pos_b = pos_a + normal * (rest_along_normal - depth);

        let a = world.spawn((Transform::from_position(pos_a), GlobalTransform::default(), RigidBody::new(1.0, pos_a).unwrap()));
        let b = world.spawn((Transform::from_position(pos_b), GlobalTransform::default(), RigidBody::new(1.0, pos_b).unwrap()));

        let contact = ContactInfo { normal, depth, point: (pos_a + pos_b) * 0.5 };
        correct_positions(&world, a, b, &contact, false, false);

        let new_pos_a = world.get::<&Transform>(a).unwrap().position;
        let new_pos_b = world.get::<&Transform>(b).unwrap().position;
        let separation_along_normal = (new_pos_b - new_pos_a).dot(normal);

        assert!(
            separation_along_normal >= rest_along_normal - 1e-4,
            "pair still penetrating: separation = {separation_along_normal}, expected >= {rest_along_normal}"
        );
    }
}

/// Brute-force every pair of AABBs that truly overlap (ignoring the
/// static/static exclusion [`Bvh::find_pairs`] applies on top).
fn brute_force_overlapping_pairs(items: &[(hecs::Entity, Aabb, bool)]) -> std::collections::HashSet<(hecs::Entity, hecs::Entity)> {
    let mut pairs = std::collections::HashSet::new();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let (ea, aabb_a, static_a) = items[i];
            let (eb, aabb_b, static_b) = items[j];
            if (static_a && static_b) || !aabb_a.overlaps(&aabb_b, 0.0) {
                continue;
            }
            let pair = if ea < eb { (ea, eb) } else { (eb, ea) };
            pairs.insert(pair);
        }
    }
    pairs
}

#[test]
fn bvh_find_pairs_is_a_superset_of_every_true_aabb_overlap() {
    let mut rng = Xorshift32::new(0xB10C);

    for trial in 0..200 {
        let mut world = hecs::World::new();
        let count = 2 + (trial % 15);
        let mut items = Vec::with_capacity(count);

        for i in 0..count {
            let entity = world.spawn(());
            let center = rng.vec3(-10.0, 10.0);
            let half_extent = rng.vec3(0.1, 2.0);
            let aabb = Aabb {
                min: center - half_extent,
                max: center + half_extent,
            };
            let is_static = i % 3 == 0;
            items.push((entity, aabb, is_static));
        }

        let expected = brute_force_overlapping_pairs(&items);
        let found: std::collections::HashSet<(hecs::Entity, hecs::Entity)> = Bvh::build(items, 0.0)
            .find_pairs()
            .into_iter()
            .map(|(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect();

        for pair in &expected {
            assert!(found.contains(pair), "bvh dropped a truly overlapping pair: {pair:?}");
        }
    }
}

#[test]
fn gjk_intersection_agrees_with_sphere_distance_away_from_the_contact_boundary() {
    let mut rng = Xorshift32::new(0x5EED);
    let mut checked = 0;

    for _ in 0..1000 {
        let center_a = rng.vec3(-5.0, 5.0);
        let center_b = rng.vec3(-5.0, 5.0);
        let radius_a = rng.range(0.2, 2.0);
        let radius_b = rng.range(0.2, 2.0);

        let distance = (center_a - center_b).length();
        let sum_radii = radius_a + radius_b;
        // Fibonacci-lattice hulls approximate a sphere with some faceting
        // error; skip the boundary band where that error could flip the
        // verdict and only check configurations GJK must get right.
        let margin = 0.05 * sum_radii.max(0.1);
        if (distance - sum_radii).abs() < margin {
            continue;
        }

        let a = sphere_collider(center_a, radius_a);
        let b = sphere_collider(center_b, radius_b);
        let intersects = gjk::intersect(&a, &b, 50).is_some();
        let should_intersect = distance < sum_radii;

        assert_eq!(intersects, should_intersect, "distance={distance}, sum_radii={sum_radii}");
        checked += 1;
    }

    assert!(checked > 500, "too many configurations fell inside the boundary margin: {checked}");
}
