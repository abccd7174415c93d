//! Narrow interfaces to the rest of the engine.
//!
//! The physics core never touches rendering, asset import, input, or a GPU
//! directly; it calls out to these traits instead, so a host can supply
//! GPU-accelerated or file-backed implementations without this crate
//! knowing about wgpu, an asset format, or a window.

use std::collections::HashMap;

use glam::Vec3;

use crate::config::PhysicsConfig;
use crate::error::{PhysicsError, Result};

/// Supplies per-tick inputs and the root node list. Implemented by the host
/// (e.g. the rest of the engine's scene/app layer).
pub trait SceneHost {
    fn config(&self) -> &PhysicsConfig;
    fn dt(&self) -> f32;
    /// Top-level nodes, in the order the scene graph update should visit them.
    fn roots(&self) -> &[hecs::Entity];
}

/// One collider's worth of input to a batched transform.
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    pub local_vertices: &'a [Vec3],
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

/// Maps local collider vertices to world space, batched across every dirty
/// collider in one call. A GPU-backed host can dispatch this as a single
/// compute pass; [`CpuTransformer`] is the reference fallback.
pub trait Transformer {
    fn transform(&self, batch: &[TransformRequest<'_>]) -> Vec<Vec<Vec3>>;
}

/// Pure-CPU reference implementation of [`Transformer`], using the exact
/// matrix composition [`crate::ecs::components::transform::compose_model_matrix`]
/// applies elsewhere in the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuTransformer;

impl Transformer for CpuTransformer {
    fn transform(&self, batch: &[TransformRequest<'_>]) -> Vec<Vec<Vec3>> {
        batch
            .iter()
            .map(|req| {
                let matrix = crate::ecs::components::transform::compose_model_matrix(
                    req.position,
                    req.rotation,
                    req.scale,
                );
                req.local_vertices
                    .iter()
                    .map(|v| matrix.transform_point3(*v))
                    .collect()
            })
            .collect()
    }
}

/// A convex hull definition keyed by name.
#[derive(Debug, Clone)]
pub struct MeshDefinition {
    /// Unique points used for physics; render triangles are not part of the core.
    pub points: Vec<Vec3>,
    /// Volume used as a cheap density fallback. The unit cube's volume (8,
    /// since it spans `[-1, 1]`) is the engine-wide default.
    pub base_volume: f32,
}

impl MeshDefinition {
    pub const DEFAULT_BASE_VOLUME: f32 = 8.0;
}

/// Resolves named meshes to convex hull definitions.
pub trait MeshLibrary {
    fn lookup(&self, name: &str) -> Result<MeshDefinition>;
}

/// A trivial in-memory [`MeshLibrary`], mainly useful for tests and
/// headless hosts that build geometry procedurally.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMeshLibrary {
    meshes: HashMap<String, MeshDefinition>,
}

impl InMemoryMeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, points: Vec<Vec3>, base_volume: f32) {
        self.meshes
            .insert(name.into(), MeshDefinition { points, base_volume });
    }
}

impl MeshLibrary for InMemoryMeshLibrary {
    fn lookup(&self, name: &str) -> Result<MeshDefinition> {
        self.meshes
            .get(name)
            .cloned()
            .ok_or_else(|| PhysicsError::MissingMesh(name.to_string()))
    }
}
