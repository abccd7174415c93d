//! Orchestrates contact resolution across the candidate pairs broad phase hands over.
//!
//! Each pair is resolved at most once per tick — broad phase enumerates
//! unique unordered pairs, so the "already collided" relation is
//! satisfied by construction rather than tracked separately.

use hecs::Entity;

use crate::config::PhysicsConfig;
use crate::ecs::components::physics::Collider;
use crate::physics::contact::{apply_impulse, correct_positions};
use crate::physics::narrowphase;

/// Resolve every candidate pair. Returns the number of pairs that actually
/// produced a contact (and were therefore position-corrected).
pub fn resolve_pairs(world: &hecs::World, pairs: &[(Entity, Entity)], config: &PhysicsConfig) -> usize {
    let mut resolved = 0;

    for &(a, b) in pairs {
        let (contact, material_a, material_b, static_a, static_b) = {
            let collider_a = match world.get::<&Collider>(a) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let collider_b = match world.get::<&Collider>(b) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let contact = narrowphase::detect(&collider_a, &collider_b, config);
            (contact, collider_a.material, collider_b.material, collider_a.is_static, collider_b.is_static)
        };

        let Some(contact) = contact else {
            continue;
        };

        correct_positions(world, a, b, &contact, static_a, static_b);
        // Every narrow-phase contact here carries exactly one point; dividing
        // by a contact count of 1 keeps the general multi-point formula intact.
        apply_impulse(world, a, b, &contact, material_a, material_b, 1, config.tangent_velocity_epsilons);
        resolved += 1;
    }

    resolved
}
