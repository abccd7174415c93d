//! Global configuration consolidated into a single struct passed to `step`.
//!
//! Accelerations, the death plane, and the GJK iteration cap are gathered
//! here rather than kept as loose globals, so a host can own exactly one
//! `PhysicsConfig` per world.

use glam::Vec3;

/// Tuning knobs for one [`crate::physics::PhysicsWorld`].
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Constant world-space accelerations applied to every dynamic body each tick.
    /// Default: a single `(0, -9.8, 0)` gravity vector.
    pub accelerations: Vec<Vec3>,
    /// Nodes with `position.y` below this are snapped back to their spawn point
    /// and have their velocities zeroed. Default: `-50.0`.
    pub death_plane: f32,
    /// Maximum GJK iterations before conservatively reporting no intersection.
    /// Default: 50.
    pub gjk_max_iterations: usize,
    /// Face-visibility slack used by EPA when stitching the polytope. Default: `1e-5`.
    pub epa_face_epsilon: f32,
    /// `(no_friction, static_vs_kinetic)` tangential-speed thresholds used by the
    /// contact solver. Default: `(1e-7, 1e-2)`.
    pub tangent_velocity_epsilons: (f32, f32),
    /// Inclusion slack applied to AABB overlap tests in the broad phase. Default: `0.0`.
    pub broad_phase_epsilon: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            accelerations: vec![Vec3::new(0.0, -9.8, 0.0)],
            death_plane: -50.0,
            gjk_max_iterations: 50,
            epa_face_epsilon: 1e-5,
            tangent_velocity_epsilons: (1e-7, 1e-2),
            broad_phase_epsilon: 0.0,
        }
    }
}

impl PhysicsConfig {
    /// Sum of all configured accelerations, applied once per tick per dynamic body.
    pub fn net_acceleration(&self) -> Vec3 {
        self.accelerations.iter().copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_standard_gravity() {
        let config = PhysicsConfig::default();
        assert_eq!(config.net_acceleration(), Vec3::new(0.0, -9.8, 0.0));
        assert_eq!(config.gjk_max_iterations, 50);
    }
}
