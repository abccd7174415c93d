//! `hecs`-backed entity storage for scene nodes, rigid bodies, colliders,
//! and skeletons.

pub mod components;

pub mod prelude {
    pub use super::components::*;
}
