//! Rigid-body physics core.
//!
//! # Pipeline
//!
//! Each [`PhysicsWorld::step`] runs a fixed, single-threaded sequence:
//!
//! 1. Integrate rigid bodies (gravity, linear and angular motion) and
//!    propagate world transforms down the scene graph.
//! 2. Resolve skeleton joints.
//! 3. Flush the collider world-space cache for whatever the first two
//!    phases marked dirty.
//! 4. Broad phase: rebuild the BVH, collect candidate pairs.
//! 5. Narrow phase + impulse resolution for every candidate pair.
//!
//! Ticks with `dt <= 0` or `dt > 0.05` are skipped outright rather than
//! risking a tunneling step.

pub mod broadphase;
pub mod contact;
pub mod narrowphase;
pub mod solver;

use crate::config::PhysicsConfig;
use crate::interfaces::{CpuTransformer, Transformer};
use crate::scene::{collider_cache, graph};
use crate::skeleton;

/// Per-tick summary, replacing a bare `bool` return so callers can log or
/// assert on exactly what happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub resolved_contacts: usize,
    pub reset_nodes: usize,
}

/// Owns the tuning configuration and the [`Transformer`] used to flush the
/// collider cache. Carries no per-tick state across steps — contacts are
/// fully recomputed every tick (no persistent manifold).
pub struct PhysicsWorld {
    pub config: PhysicsConfig,
    transformer: Box<dyn Transformer>,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            transformer: Box::new(CpuTransformer),
        }
    }

    pub fn with_transformer(config: PhysicsConfig, transformer: Box<dyn Transformer>) -> Self {
        Self { config, transformer }
    }

    pub fn step(&mut self, world: &mut hecs::World, dt: f32) -> StepReport {
        if dt <= 0.0 || dt > 0.05 {
            tracing::warn!(dt, "skipping physics step: dt out of the stable range (0, 0.05]");
            return StepReport::default();
        }

        let reset_nodes = graph::update(world, &self.config, dt);
        tracing::trace!(reset_nodes, "scene graph updated");

        skeleton::resolve(world, dt);
        tracing::trace!("skeleton joints resolved");

        let flushed = collider_cache::flush_dirty_colliders(world, self.transformer.as_ref());
        tracing::trace!(flushed, "collider cache flushed");

        let pairs = broadphase::find_pairs(world, self.config.broad_phase_epsilon);
        tracing::trace!(candidate_pairs = pairs.len(), "broad phase complete");

        let resolved_contacts = solver::resolve_pairs(world, &pairs, &self.config);
        tracing::trace!(resolved_contacts, "narrow phase and solver complete");

        StepReport { resolved_contacts, reset_nodes }
    }
}
