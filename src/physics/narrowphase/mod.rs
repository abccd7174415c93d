//! Narrow phase: GJK intersection test followed by EPA penetration extraction.

pub mod epa;
pub mod gjk;

use crate::config::PhysicsConfig;
use crate::ecs::components::physics::Collider;
use crate::physics::contact::ContactInfo;

/// Run GJK, then EPA on the terminating simplex. `None` means the hulls
/// don't overlap, or the iteration caps were hit before a verdict.
pub fn detect(a: &Collider, b: &Collider, config: &PhysicsConfig) -> Option<ContactInfo> {
    let simplex = gjk::intersect(a, b, config.gjk_max_iterations)?;
    epa::penetration(&simplex, config.gjk_max_iterations, config.epa_face_epsilon, |direction| {
        let pa = a.support(direction);
        let pb = b.support(-direction);
        gjk::SupportPoint { point: pa - pb, a: pa, b: pb }
    })
}
