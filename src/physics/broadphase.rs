//! Broad phase collision detection: a median-split bounding volume
//! hierarchy over collider AABBs.
//!
//! [`Bvh::find_pairs`] is the only thing callers see; the tree layout can
//! change without touching narrow phase or the solver.

use hecs::Entity;

use crate::ecs::components::physics::{Aabb, Collider};

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        aabb: Aabb,
        entity: Entity,
        is_static: bool,
    },
    Internal {
        aabb: Aabb,
        left: usize,
        right: usize,
    },
}

impl Node {
    fn aabb(&self) -> Aabb {
        match self {
            Node::Leaf { aabb, .. } => *aabb,
            Node::Internal { aabb, .. } => *aabb,
        }
    }
}

/// A bounding volume hierarchy rebuilt from scratch every tick, over the
/// colliders whose world-space caches are current.
pub struct Bvh {
    nodes: Vec<Node>,
    root: Option<usize>,
    epsilon: f32,
}

impl Bvh {
    /// Build from `(entity, aabb, is_static)` triples. `epsilon` is the
    /// inclusion slack applied to every overlap test (see
    /// [`crate::config::PhysicsConfig::broad_phase_epsilon`]).
    pub fn build(mut items: Vec<(Entity, Aabb, bool)>, epsilon: f32) -> Self {
        let mut nodes = Vec::new();
        let root = if items.is_empty() {
            None
        } else {
            Some(Self::build_recursive(&mut items, &mut nodes))
        };
        Self { nodes, root, epsilon }
    }

    fn build_recursive(items: &mut [(Entity, Aabb, bool)], nodes: &mut Vec<Node>) -> usize {
        if items.len() == 1 {
            let (entity, aabb, is_static) = items[0];
            nodes.push(Node::Leaf { aabb, entity, is_static });
            return nodes.len() - 1;
        }

        let union = items
            .iter()
            .skip(1)
            .fold(items[0].1, |acc, (_, aabb, _)| acc.union(aabb));
        let extent = union.extent();
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        items.sort_by(|a, b| {
            let ca = a.1.center();
            let cb = b.1.center();
            let (va, vb) = match axis {
                0 => (ca.x, cb.x),
                1 => (ca.y, cb.y),
                _ => (ca.z, cb.z),
            };
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = items.len() / 2;
        let (left_items, right_items) = items.split_at_mut(mid);
        let left = Self::build_recursive(left_items, nodes);
        let right = Self::build_recursive(right_items, nodes);
        let aabb = nodes[left].aabb().union(&nodes[right].aabb());
        nodes.push(Node::Internal { aabb, left, right });
        nodes.len() - 1
    }

    /// Every pair of leaves whose AABBs overlap, excluding static/static pairs.
    pub fn find_pairs(&self) -> Vec<(Entity, Entity)> {
        let mut pairs = Vec::new();
        if let Some(root) = self.root {
            self.self_collide(root, &mut pairs);
        }
        pairs
    }

    fn self_collide(&self, idx: usize, pairs: &mut Vec<(Entity, Entity)>) {
        if let Node::Internal { left, right, .. } = self.nodes[idx] {
            self.self_collide(left, pairs);
            self.self_collide(right, pairs);
            self.collide_pair(left, right, pairs);
        }
    }

    fn collide_pair(&self, a: usize, b: usize, pairs: &mut Vec<(Entity, Entity)>) {
        if !self.nodes[a].aabb().overlaps(&self.nodes[b].aabb(), self.epsilon) {
            return;
        }
        match (&self.nodes[a], &self.nodes[b]) {
            (
                Node::Leaf {
                    entity: ea,
                    is_static: sa,
                    ..
                },
                Node::Leaf {
                    entity: eb,
                    is_static: sb,
                    ..
                },
            ) => {
                if !(*sa && *sb) {
                    pairs.push((*ea, *eb));
                }
            }
            (Node::Leaf { .. }, Node::Internal { left, right, .. }) => {
                let (left, right) = (*left, *right);
                self.collide_pair(a, left, pairs);
                self.collide_pair(a, right, pairs);
            }
            (Node::Internal { left, right, .. }, Node::Leaf { .. }) => {
                let (left, right) = (*left, *right);
                self.collide_pair(left, b, pairs);
                self.collide_pair(right, b, pairs);
            }
            (Node::Internal { left: l1, right: r1, .. }, Node::Internal { left: l2, right: r2, .. }) => {
                let (l1, r1, l2, r2) = (*l1, *r1, *l2, *r2);
                self.collide_pair(l1, l2, pairs);
                self.collide_pair(l1, r2, pairs);
                self.collide_pair(r1, l2, pairs);
                self.collide_pair(r1, r2, pairs);
            }
        }
    }
}

/// Collect collider AABBs from the world and return the candidate pairs to
/// hand to narrow phase.
pub fn find_pairs(world: &hecs::World, epsilon: f32) -> Vec<(Entity, Entity)> {
    let items: Vec<(Entity, Aabb, bool)> = world
        .query::<&Collider>()
        .iter()
        .map(|(entity, collider)| (entity, collider.world_aabb, collider.is_static))
        .collect();
    Bvh::build(items, epsilon).find_pairs()
}
