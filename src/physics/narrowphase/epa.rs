//! EPA (Expanding Polytope Algorithm): penetration depth, contact normal,
//! and contact point from a GJK termination simplex.

use glam::Vec3;

use super::gjk::{Simplex, SupportPoint};
use crate::physics::contact::ContactInfo;

struct Face {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

fn face_from(polytope: &[SupportPoint], indices: [usize; 3]) -> Option<Face> {
    let a = polytope[indices[0]].point;
    let b = polytope[indices[1]].point;
    let c = polytope[indices[2]].point;
    let raw_normal = (b - a).cross(c - a);
    if raw_normal.length_squared() < 1e-8 {
        return None;
    }
    let len = raw_normal.length();
    let mut normal = raw_normal / len;
    let mut distance = normal.dot(a);
    if distance < 0.0 {
        normal = -normal;
        distance = -distance;
    }
    Some(Face { indices, normal, distance })
}

fn add_edge(edges: &mut Vec<[usize; 2]>, a: usize, b: usize) {
    if let Some(pos) = edges.iter().position(|e| *e == [b, a]) {
        edges.swap_remove(pos);
    } else {
        edges.push([a, b]);
    }
}

/// Barycentric weights of `p` relative to triangle `(a, b, c)`, used to map
/// a point on a Minkowski-difference face back onto each hull's own vertices.
fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-10 {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}

/// Closest point on triangle `(a, b, c)` to the origin, via the standard
/// Voronoi-region decomposition.
fn closest_point_on_triangle(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ao = -a;

    let d1 = ab.dot(ao);
    let d2 = ac.dot(ao);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bo = -b;
    let d3 = ab.dot(bo);
    let d4 = ac.dot(bo);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let co = -c;
    let d5 = ab.dot(co);
    let d6 = ac.dot(co);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Expand `simplex` into a polytope and walk its closest face to the origin
/// outward until convergence, within `face_epsilon`.
pub fn penetration(simplex: &Simplex, max_iterations: usize, face_epsilon: f32, support: impl Fn(Vec3) -> SupportPoint) -> Option<ContactInfo> {
    let mut polytope = simplex.points.clone();
    if polytope.len() < 4 {
        return None;
    }

    let seed = [[0usize, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];
    let mut faces: Vec<Face> = seed.into_iter().filter_map(|indices| face_from(&polytope, indices)).collect();
    if faces.is_empty() {
        return None;
    }

    for _ in 0..max_iterations {
        let (closest_idx, _) = faces
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal))
            .expect("faces is non-empty");

        let closest = &faces[closest_idx];
        let normal = if closest.normal.length_squared() < 1e-10 { Vec3::Y } else { closest.normal };
        let new_point = support(normal);
        let new_dist = new_point.point.dot(normal);

        if new_dist - closest.distance < face_epsilon {
            let a = polytope[closest.indices[0]];
            let b = polytope[closest.indices[1]];
            let c = polytope[closest.indices[2]];
            let on_face = closest_point_on_triangle(a.point, b.point, c.point);
            let (u, v, w) = barycentric(on_face, a.point, b.point, c.point);
            let contact_point = a.a * u + b.a * v + c.a * w;

            return Some(ContactInfo {
                normal,
                depth: closest.distance,
                point: contact_point,
            });
        }

        let new_idx = polytope.len();
        polytope.push(new_point);

        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut i = 0;
        while i < faces.len() {
            if faces[i].normal.dot(new_point.point - polytope[faces[i].indices[0]].point) > 0.0 {
                let removed = faces.swap_remove(i);
                add_edge(&mut edges, removed.indices[0], removed.indices[1]);
                add_edge(&mut edges, removed.indices[1], removed.indices[2]);
                add_edge(&mut edges, removed.indices[2], removed.indices[0]);
            } else {
                i += 1;
            }
        }

        for edge in edges {
            if let Some(face) = face_from(&polytope, [edge[0], edge[1], new_idx]) {
                faces.push(face);
            }
        }

        if faces.is_empty() {
            return None;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, Material};
    use crate::physics::narrowphase::gjk;
    use glam::Vec3;
    use std::sync::Arc;

    fn cube(offset: Vec3) -> Collider {
        let verts: Arc<[Vec3]> = Arc::from(vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ]);
        let mut collider = Collider::new(verts, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Material::default(), false).unwrap();
        collider.world_vertices = collider.local_vertices.iter().map(|v| *v + offset).collect();
        collider
    }

    #[test]
    fn overlapping_cubes_yield_positive_depth_along_x() {
        let a = cube(Vec3::ZERO);
        let b = cube(Vec3::new(1.5, 0.0, 0.0));
        let simplex = gjk::intersect(&a, &b, 50).expect("cubes overlap");
        let contact = penetration(&simplex, 64, 1e-5, |direction| {
            let pa = a.support(direction);
            let pb = b.support(-direction);
            gjk::SupportPoint { point: pa - pb, a: pa, b: pb }
        });
        let contact = contact.expect("EPA should converge");
        assert!(contact.depth > 0.0);
        assert!(contact.normal.x.abs() > 0.9);
    }
}
