//! ECS components: transform/hierarchy, rigid-body physics, skeleton.

pub mod physics;
pub mod skeleton;
pub mod transform;

pub use physics::*;
pub use skeleton::*;
pub use transform::*;
