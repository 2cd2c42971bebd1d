//! Per-vertex normals from triangle geometry.

use tracing::warn;

use crate::util::{DVec3, Point3, UnitVector3};

/// Squared edge length below which a triangle is treated as degenerate.
const DEGENERATE_EPS: f64 = 1e-15;

fn degenerate(p1: Point3, p2: Point3, p3: Point3) -> bool {
    p2.distance_squared(p1) < DEGENERATE_EPS
        || p3.distance_squared(p1) < DEGENERATE_EPS
        || p3.distance_squared(p2) < DEGENERATE_EPS
}

/// Unnormalized triangle normal, `(p2 - p1) x (p3 - p1)`.
///
/// Degenerate triangles yield the zero vector.
pub fn triangle_normal(p1: Point3, p2: Point3, p3: Point3) -> DVec3 {
    if degenerate(p1, p2, p3) {
        return DVec3::ZERO;
    }
    (p2 - p1).cross(p3 - p1)
}

/// Per-vertex normals for an indexed triangle list.
///
/// Each vertex normal is the sum of the unnormalized normals of the triangles
/// using it, so larger faces weigh more; [`UnitVector3`] then normalizes the
/// sum. Vertices used by no triangle, or whose contributions cancel, get
/// `+Z`. Returns `None` for fewer than 3 coordinates, an index count that is
/// not a positive multiple of 3, or an out-of-range index.
pub fn calc_triangle_normals(coords: &[Point3], index: &[i32]) -> Option<Vec<UnitVector3>> {
    if coords.len() < 3 {
        warn!("normal calculation needs at least 3 coordinates, got {}", coords.len());
        return None;
    }
    if index.is_empty() || index.len() % 3 != 0 {
        warn!("triangle index count {} is not a positive multiple of 3", index.len());
        return None;
    }

    let mut sums = vec![DVec3::ZERO; coords.len()];
    for tri in index.chunks_exact(3) {
        let mut v = [0usize; 3];
        for (slot, &i) in v.iter_mut().zip(tri) {
            if i < 0 || i as usize >= coords.len() {
                warn!("triangle index {i} out of range (0..{})", coords.len());
                return None;
            }
            *slot = i as usize;
        }
        let n = triangle_normal(coords[v[0]], coords[v[1]], coords[v[2]]);
        for i in v {
            sums[i] += n;
        }
    }

    Some(sums.into_iter().map(UnitVector3::from_dvec3).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_normal_ccw() {
        let n = triangle_normal(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        );
        assert_eq!(n, DVec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_degenerate_triangle() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let q = p + DVec3::splat(1e-9);
        assert_eq!(triangle_normal(p, q, p), DVec3::ZERO);

        let norms = calc_triangle_normals(&[p, q, p], &[0, 1, 2]).expect("normals");
        assert_eq!(norms, vec![UnitVector3::Z; 3]);
        assert!(norms.iter().all(|n| !n.x().is_nan()));
    }

    #[test]
    fn test_unused_vertex_gets_default() {
        let coords = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let norms = calc_triangle_normals(&coords, &[0, 1, 2]).expect("normals");
        assert!((norms[0].x() - 1.0).abs() < 1e-12);
        assert_eq!(norms[3], UnitVector3::Z);
    }

    #[test]
    fn test_area_weighting() {
        // a large face along +Z and a small one along +X share vertex 0
        let coords = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let norms = calc_triangle_normals(&coords, &[0, 1, 2, 0, 3, 4]).expect("normals");
        assert!(norms[0].z() > norms[0].x());
    }

    #[test]
    fn test_rejects_bad_input() {
        let coords = [Point3::ZERO, Point3::X, Point3::Y];
        assert!(calc_triangle_normals(&coords[..2], &[0, 1, 1]).is_none());
        assert!(calc_triangle_normals(&coords, &[]).is_none());
        assert!(calc_triangle_normals(&coords, &[0, 1]).is_none());
        assert!(calc_triangle_normals(&coords, &[0, 1, 3]).is_none());
        assert!(calc_triangle_normals(&coords, &[0, -1, 2]).is_none());
    }
}
