//! Planar (2D) primitives.
//!
//! Used directly by 2D rooms, where walls are segments in the z = 0 plane,
//! and by 3D polygons once their corners are expressed in the wall's own
//! plane coordinates.

use crate::geom::EPS;

/// A point (or vector) in a plane.
pub type Point2 = [f64; 2];

/// Where a point lies relative to a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Inside,
    Outside,
    Boundary,
}

/// Intersection of two planar segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: Point2,
    /// The intersection is (within EPS) one of the endpoints of the first segment.
    pub at_first_end: bool,
    /// The intersection is (within EPS) one of the endpoints of the second segment.
    pub at_second_end: bool,
}

fn sub(a: Point2, b: Point2) -> Point2 {
    [a[0] - b[0], a[1] - b[1]]
}

fn cross(a: Point2, b: Point2) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

fn norm(a: Point2) -> f64 {
    (a[0] * a[0] + a[1] * a[1]).sqrt()
}

/// Orientation of three points.
///
/// Returns 1 for counter-clockwise, -1 for clockwise and 0 if collinear.
pub fn ccw3p(p1: Point2, p2: Point2, p3: Point2) -> i32 {
    let d = cross(sub(p2, p1), sub(p3, p1));
    if d > EPS {
        1
    } else if d < -EPS {
        -1
    } else {
        0
    }
}

/// Checks if two segments `a1-a2` and `b1-b2` intersect (touching counts).
pub fn check_intersection_2d_segments(a1: Point2, a2: Point2, b1: Point2, b2: Point2) -> bool {
    intersection_2d_segments(a1, a2, b1, b2).is_some()
}

/// Finds the intersection of segments `a1-a2` and `b1-b2`.
///
/// Collinear overlapping segments are reported as no intersection: a path
/// sliding along a wall does not cross it.
pub fn intersection_2d_segments(
    a1: Point2,
    a2: Point2,
    b1: Point2,
    b2: Point2,
) -> Option<SegmentHit> {
    let r = sub(a2, a1);
    let s = sub(b2, b1);
    let len_r = norm(r);
    let len_s = norm(s);
    if len_r < EPS || len_s < EPS {
        return None;
    }

    let denom = cross(r, s);
    if denom.abs() < EPS * len_r * len_s {
        return None; // Parallel or collinear
    }

    let qp = sub(b1, a1);
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;

    // Tolerances expressed as parameter fractions
    let tol_t = EPS / len_r;
    let tol_u = EPS / len_s;
    if t < -tol_t || t > 1.0 + tol_t || u < -tol_u || u > 1.0 + tol_u {
        return None;
    }

    Some(SegmentHit {
        point: [a1[0] + t * r[0], a1[1] + t * r[1]],
        at_first_end: t.abs() <= tol_t || (1.0 - t).abs() <= tol_t,
        at_second_end: u.abs() <= tol_u || (1.0 - u).abs() <= tol_u,
    })
}

/// Distance from `p` to the segment `a-b`.
pub fn dist_point_segment(p: Point2, a: Point2, b: Point2) -> f64 {
    let ab = sub(b, a);
    let ap = sub(p, a);
    let len2 = ab[0] * ab[0] + ab[1] * ab[1];
    if len2 < EPS * EPS {
        return norm(ap);
    }
    let t = ((ap[0] * ab[0] + ap[1] * ab[1]) / len2).clamp(0.0, 1.0);
    norm([ap[0] - t * ab[0], ap[1] - t * ab[1]])
}

/// Classifies a point against a simple polygon (crossing-number test with
/// an explicit boundary check).
pub fn is_inside_2d_polygon(p: Point2, polygon: &[Point2]) -> Location {
    let n = polygon.len();
    if n < 3 {
        return Location::Outside;
    }

    for i in 0..n {
        if dist_point_segment(p, polygon[i], polygon[(i + 1) % n]) < EPS {
            return Location::Boundary;
        }
    }

    let mut inside = false;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x_cross = a[0] + (p[1] - a[1]) / (b[1] - a[1]) * (b[0] - a[0]);
            if p[0] < x_cross {
                inside = !inside;
            }
        }
    }

    if inside {
        Location::Inside
    } else {
        Location::Outside
    }
}

/// Signed area of a planar polygon (positive when counter-clockwise).
pub fn area_2d_polygon(polygon: &[Point2]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| cross(polygon[i], polygon[(i + 1) % n]))
        .sum();
    0.5 * twice
}
