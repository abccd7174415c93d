//! Inverse inertia tensor computation: point-mass sums over hull
//! vertices for leaves, parallel-axis composition for groups.

use glam::{Mat3, Vec3};

/// Sum point-mass contributions over a collider's local unique vertices and
/// invert. Division is by vertex count, not mass — this assumes a uniform
/// point-mass distribution over hull vertices rather than over hull volume
/// (see `DESIGN.md`, Open Question b).
pub fn aligned_inverse_inertia(local_vertices: &[Vec3]) -> Mat3 {
    debug_assert!(!local_vertices.is_empty());

    let mut ixx = 0.0f32;
    let mut iyy = 0.0f32;
    let mut izz = 0.0f32;
    let mut ixy = 0.0f32;
    let mut ixz = 0.0f32;
    let mut iyz = 0.0f32;

    for v in local_vertices {
        ixx += v.y * v.y + v.z * v.z;
        iyy += v.x * v.x + v.z * v.z;
        izz += v.x * v.x + v.y * v.y;
        ixy -= v.x * v.y;
        ixz -= v.x * v.z;
        iyz -= v.y * v.z;
    }

    let n = local_vertices.len() as f32;
    let tensor = Mat3::from_cols(
        Vec3::new(ixx, ixy, ixz),
        Vec3::new(ixy, iyy, iyz),
        Vec3::new(ixz, iyz, izz),
    ) * (1.0 / n);

    tensor.inverse()
}

/// Compose a group's inverse inertia from its children's inverse inertia
/// tensors and local offsets, via the parallel-axis theorem:
///
/// `I_group^-1 = inverse( sum( inverse(child_I^-1) + (d.d) * Identity - d (x) d ) / n )`
pub fn compose_group_inverse_inertia(children: &[(Mat3, Vec3)]) -> Mat3 {
    debug_assert!(!children.is_empty());

    let mut sum = Mat3::ZERO;
    for (child_inverse, d) in children {
        let child_tensor = child_inverse.inverse();
        let dd = d.length_squared();
        let outer = Mat3::from_cols(*d * d.x, *d * d.y, *d * d.z);
        sum += child_tensor + Mat3::IDENTITY * dd - outer;
    }
    let n = children.len() as f32;
    (sum * (1.0 / n)).inverse()
}
