//! Errors surfaced across the crate boundary.
//!
//! Only setup-time (`Config`) mistakes ever reach the host. Numeric edge
//! cases and runaway nodes are recovered locally and never become errors
//! (see the module docs on [`crate::physics`] and [`crate::scene`]).

use thiserror::Error;

/// A fatal setup error reported to the host.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// A rigid body was constructed with non-positive mass.
    #[error("rigid body mass must be positive, got {0}")]
    NonPositiveMass(f32),

    /// A collider's elasticity was outside `[0, 1]`.
    #[error("collider elasticity must be in [0, 1], got {0}")]
    InvalidElasticity(f32),

    /// A collider's friction coefficients violated `static >= kinetic >= 0`.
    #[error("collider friction must satisfy static >= kinetic >= 0, got static={static_friction}, kinetic={kinetic_friction}")]
    InvalidFriction {
        static_friction: f32,
        kinetic_friction: f32,
    },

    /// A collider was built from an empty vertex set.
    #[error("collider hull must contain at least one vertex")]
    EmptyHull,

    /// A named mesh was requested from a [`crate::interfaces::MeshLibrary`] but not found.
    #[error("no mesh registered under name {0:?}")]
    MissingMesh(String),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
