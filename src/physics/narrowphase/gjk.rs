//! GJK (Gilbert-Johnson-Keerthi) convex intersection test over the
//! Minkowski difference of two hulls.

use glam::Vec3;

use crate::ecs::components::physics::Collider;

/// One Minkowski-difference vertex, carrying the original A/B support
/// vertices so EPA can map a polytope face back onto object A's surface.
#[derive(Debug, Clone, Copy)]
pub struct SupportPoint {
    pub point: Vec3,
    pub a: Vec3,
    pub b: Vec3,
}

#[derive(Debug, Clone)]
pub struct Simplex {
    pub points: Vec<SupportPoint>,
}

impl Simplex {
    fn new() -> Self {
        Self { points: Vec::with_capacity(4) }
    }
}

fn minkowski_support(a: &Collider, b: &Collider, direction: Vec3) -> SupportPoint {
    let pa = a.support(direction);
    let pb = b.support(-direction);
    SupportPoint { point: pa - pb, a: pa, b: pb }
}

fn triple_cross(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

/// Run GJK for up to `max_iterations`. Returns the terminating simplex if
/// the hulls intersect, or conservatively `None` if the iteration cap is
/// hit before the origin is resolved either way.
pub fn intersect(a: &Collider, b: &Collider, max_iterations: usize) -> Option<Simplex> {
    let center_offset = a.geometric_center - b.geometric_center;
    let mut direction = if center_offset.length_squared() > 1e-10 { center_offset } else { Vec3::X };
    let mut simplex = Simplex::new();
    let mut tie_breaker = 0usize;

    let first = minkowski_support(a, b, direction);
    simplex.points.push(first);
    direction = -first.point;

    if direction.length_squared() < 1e-10 {
        return Some(simplex);
    }

    let second = minkowski_support(a, b, direction);
    if second.point.dot(direction) < 0.0 {
        return None;
    }
    simplex.points.push(second);
    direction = triple_cross(second.point - first.point, -first.point, second.point - first.point);
    if direction.length_squared() < 1e-10 {
        direction = (second.point - first.point).any_orthonormal_vector();
    }

    for _ in 0..max_iterations {
        let candidate = minkowski_support(a, b, direction);
        if candidate.point.dot(direction) < 0.0 {
            return None;
        }
        simplex.points.push(candidate);

        if do_simplex(&mut simplex, &mut direction, &mut tie_breaker) {
            return Some(simplex);
        }
        if direction.length_squared() < 1e-10 {
            return Some(simplex);
        }
    }

    None
}

fn do_simplex(simplex: &mut Simplex, direction: &mut Vec3, tie_breaker: &mut usize) -> bool {
    match simplex.points.len() {
        2 => do_simplex_line(simplex, direction),
        3 => do_simplex_triangle(simplex, direction),
        4 => do_simplex_tetrahedron(simplex, direction, tie_breaker),
        _ => false,
    }
}

fn do_simplex_line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[1];
    let b = simplex.points[0];
    let ab = b.point - a.point;
    let ao = -a.point;

    if ab.dot(ao) > 0.0 {
        *direction = triple_cross(ab, ao, ab);
    } else {
        simplex.points = vec![a];
        *direction = ao;
    }
    false
}

fn do_simplex_triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[2];
    let b = simplex.points[1];
    let c = simplex.points[0];
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ao = -a.point;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.points = vec![c, a];
            *direction = triple_cross(ac, ao, ac);
        } else {
            simplex.points = vec![b, a];
            return do_simplex_line(simplex, direction);
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        simplex.points = vec![b, a];
        return do_simplex_line(simplex, direction);
    } else if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.points = vec![b, c, a];
        *direction = -abc;
    }
    false
}

/// Origin-vs-tetrahedron test. When more than one face sees the origin, the
/// choice is resolved by a deterministic round-robin over the candidate
/// faces rather than always preferring `abc`, so replays of the same scene
/// take the same path through the simplex.
fn do_simplex_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3, tie_breaker: &mut usize) -> bool {
    let a = simplex.points[3];
    let b = simplex.points[2];
    let c = simplex.points[1];
    let d = simplex.points[0];
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ad = d.point - a.point;
    let ao = -a.point;

    let abc = ab.cross(ac);
    let acd = ac.cross(ad);
    let adb = ad.cross(ab);

    const FACE_SLACK: f32 = -1e-4;
    let outside: Vec<usize> = [abc.dot(ao), acd.dot(ao), adb.dot(ao)]
        .iter()
        .enumerate()
        .filter(|(_, dist)| **dist > FACE_SLACK)
        .map(|(i, _)| i)
        .collect();

    if outside.is_empty() {
        return true;
    }

    let chosen = outside[*tie_breaker % outside.len()];
    *tie_breaker = tie_breaker.wrapping_add(1);

    match chosen {
        0 => {
            simplex.points = vec![c, b, a];
            *direction = abc;
            do_simplex_triangle(simplex, direction)
        }
        1 => {
            simplex.points = vec![d, c, a];
            *direction = acd;
            do_simplex_triangle(simplex, direction)
        }
        _ => {
            simplex.points = vec![b, d, a];
            *direction = adb;
            do_simplex_triangle(simplex, direction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::Material;
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
        collider.geometric_center = offset;
        collider
    }

    #[test]
    fn overlapping_cubes_intersect() {
        let a = cube(Vec3::ZERO);
        let b = cube(Vec3::new(1.0, 0.0, 0.0));
        assert!(intersect(&a, &b, 50).is_some());
    }

    #[test]
    fn separated_cubes_do_not_intersect() {
        let a = cube(Vec3::ZERO);
        let b = cube(Vec3::new(10.0, 0.0, 0.0));
        assert!(intersect(&a, &b, 50).is_none());
    }

    #[test]
    fn touching_cubes_are_treated_as_intersecting() {
        let a = cube(Vec3::ZERO);
        let b = cube(Vec3::new(2.0, 0.0, 0.0));
        assert!(intersect(&a, &b, 50).is_some());
    }
}
