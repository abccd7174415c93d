//! Rigid-body physics core.
//!
//! A per-tick pipeline over a `hecs` scene graph: integrate rigid bodies,
//! propagate world transforms, resolve skeletal joints, then run
//! broad/narrow-phase collision detection and sequential-impulse
//! resolution. See [`physics::PhysicsWorld::step`] for the entry point.
//!
//! # Layers
//!
//! 1. **ecs** - components: transform/hierarchy, rigid body, skeleton.
//! 2. **scene** - graph update, inertia, collider world-space cache.
//! 3. **skeleton** - joint resolution.
//! 4. **physics** - broad phase, narrow phase (GJK/EPA), contact solver.
//! 5. **interfaces** - the narrow surface a host implements (transform
//!    batching, mesh lookup, per-tick config).

pub mod config;
pub mod ecs;
pub mod error;
pub mod interfaces;
pub mod physics;
pub mod scene;
pub mod skeleton;

pub use config::PhysicsConfig;
pub use ecs::prelude::*;
pub use error::{PhysicsError, Result};
pub use interfaces::{CpuTransformer, InMemoryMeshLibrary, MeshDefinition, MeshLibrary, SceneHost, TransformRequest, Transformer};
pub use physics::{PhysicsWorld, StepReport};

pub use glam;
pub use hecs;
