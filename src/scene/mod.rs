//! Scene graph: hierarchy, pose integration, and the collider world-space cache.

pub mod collider_cache;
pub mod graph;
pub mod inertia;
