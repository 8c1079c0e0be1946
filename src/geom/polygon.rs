//! Planar polygons in 3D space.
//!
//! A polygon keeps its corners, a unit normal (right-hand rule on the corner
//! order) and an orthonormal in-plane basis, so that containment questions
//! can be answered with planar primitives.

use crate::error::{Result, SimError};
use crate::geom::EPS;
use crate::geom::planar::{self, Location, Point2};
use crate::{Point, Vector};

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pts: Vec<Point>,
    vn: Vector,
    basis: [Vector; 2],
    flat: Vec<Point2>,
    area: f64,
}

impl Polygon {
    /// Creates a polygon from its corners.
    ///
    /// Fails if there are fewer than 3 corners, if the corners are collinear,
    /// not coplanar, or if the outline intersects itself.
    pub fn new(pts: Vec<Point>) -> Result<Self> {
        if pts.len() < 3 {
            return Err(SimError::geometry(format!(
                "a polygon needs at least 3 corners, got {}",
                pts.len()
            )));
        }

        let newell = newell_normal(&pts);
        let area = 0.5 * newell.length();
        let vn = newell
            .normalize()
            .ok_or_else(|| SimError::geometry("degenerate polygon: zero area"))?;
        if area < EPS * EPS {
            return Err(SimError::geometry("degenerate polygon: zero area"));
        }

        let origin = pts[0];
        for p in pts.iter() {
            let dist = Vector::from_points(origin, *p).dot(vn);
            if dist.abs() > EPS {
                return Err(SimError::geometry(format!(
                    "polygon is not planar: corner {p} is {dist:.3e} m off the plane"
                )));
            }
        }

        let u = Vector::from_points(pts[0], pts[1])
            .normalize()
            .unwrap_or_else(|| vn.any_orthogonal());
        let u = (u - vn * u.dot(vn)).normalize().unwrap_or_else(|| vn.any_orthogonal());
        let v = vn.cross(u);
        let basis = [u, v];
        let flat = flatten(&pts, basis);

        if is_self_intersecting(&flat) {
            return Err(SimError::geometry("polygon outline intersects itself"));
        }

        Ok(Self {
            pts,
            vn,
            basis,
            flat,
            area,
        })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.pts
    }

    /// Unit normal vector.
    pub fn normal(&self) -> Vector {
        self.vn
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn centroid(&self) -> Point {
        Point::centroid(&self.pts)
    }

    /// Signed distance from the plane (positive on the normal side).
    pub fn signed_distance(&self, p: Point) -> f64 {
        Vector::from_points(self.pts[0], p).dot(self.vn)
    }

    /// Coordinates of `p` projected onto the polygon plane.
    pub fn project(&self, p: Point) -> Point2 {
        let d = Vector::from_points(self.pts[0], p);
        [d.dot(self.basis[0]), d.dot(self.basis[1])]
    }

    /// Locates the orthogonal projection of `p` relative to the outline.
    pub fn locate(&self, p: Point) -> Location {
        planar::is_inside_2d_polygon(self.project(p), &self.flat)
    }

    /// Reverses the orientation (corner order and normal).
    pub fn flip(&mut self) {
        self.pts.reverse();
        self.vn = -self.vn;
        let u = self.basis[0];
        self.basis = [u, self.vn.cross(u)];
        self.flat = flatten(&self.pts, self.basis);
    }
}

/// In-plane coordinates of the corners, relative to the first one.
fn flatten(pts: &[Point], basis: [Vector; 2]) -> Vec<Point2> {
    let origin = pts[0];
    pts.iter()
        .map(|p| {
            let d = Vector::from_points(origin, *p);
            [d.dot(basis[0]), d.dot(basis[1])]
        })
        .collect()
}

/// Newell's method: area-weighted normal, valid for non-convex outlines.
fn newell_normal(pts: &[Point]) -> Vector {
    let n = pts.len();
    let mut normal = Vector::zero();
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        normal.dx += (a.y - b.y) * (a.z + b.z);
        normal.dy += (a.z - b.z) * (a.x + b.x);
        normal.dz += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Checks whether any two non-adjacent edges of the outline intersect.
fn is_self_intersecting(flat: &[Point2]) -> bool {
    let n = flat.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let a1 = flat[i];
        let a2 = flat[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue; // Adjacent through the closing edge
            }
            let b1 = flat[j];
            let b2 = flat[(j + 1) % n];
            if planar::check_intersection_2d_segments(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_xy_square() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 2.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_square_properties() {
        let sq = make_xy_square();
        assert!(sq.normal().is_close(&Vector::new(0., 0., 1.)));
        assert!((sq.area() - 4.0).abs() < 1e-12);
        assert!(sq.centroid().is_close(&Point::new(1., 1., 0.)));
        assert!((sq.signed_distance(Point::new(1., 1., 3.)) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_locate() {
        let sq = make_xy_square();
        assert_eq!(sq.locate(Point::new(1., 1., 0.)), Location::Inside);
        assert_eq!(sq.locate(Point::new(2., 1., 0.)), Location::Boundary);
        assert_eq!(sq.locate(Point::new(3., 1., 0.)), Location::Outside);
        // Projection ignores the distance to the plane
        assert_eq!(sq.locate(Point::new(1., 1., 7.)), Location::Inside);
    }

    #[test]
    fn test_non_convex_area() {
        // L-shaped outline in a vertical plane
        let l = Polygon::new(vec![
            Point::new(0., 0., 0.),
            Point::new(0., 2., 0.),
            Point::new(0., 2., 1.),
            Point::new(0., 1., 1.),
            Point::new(0., 1., 2.),
            Point::new(0., 0., 2.),
        ])
        .unwrap();
        assert!((l.area() - 3.0).abs() < 1e-12);
        assert!(l.normal().is_close(&Vector::new(1., 0., 0.)));
        assert_eq!(l.locate(Point::new(0., 1.5, 1.5)), Location::Outside);
        assert_eq!(l.locate(Point::new(0., 0.5, 1.5)), Location::Inside);
    }

    #[test]
    fn test_degenerate_polygons() {
        let collinear = Polygon::new(vec![
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(2., 0., 0.),
        ]);
        assert!(collinear.unwrap_err().is_geometry());

        let two = Polygon::new(vec![Point::new(0., 0., 0.), Point::new(1., 0., 0.)]);
        assert!(two.is_err());

        let not_planar = Polygon::new(vec![
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(1., 1., 0.),
            Point::new(0., 1., 0.5),
        ]);
        assert!(not_planar.unwrap_err().is_geometry());

        let bow_tie = Polygon::new(vec![
            Point::new(0., 0., 0.),
            Point::new(1., 1., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
        ]);
        assert!(bow_tie.unwrap_err().is_geometry());
    }

    #[test]
    fn test_flip() {
        let mut sq = make_xy_square();
        sq.flip();
        assert!(sq.normal().is_close(&Vector::new(0., 0., -1.)));
        assert!((sq.area() - 4.0).abs() < 1e-12);
        assert!((sq.signed_distance(Point::new(1., 1., 3.)) + 3.0).abs() < 1e-12);
        assert_eq!(sq.locate(Point::new(1., 1., 0.)), Location::Inside);
        assert_eq!(sq.locate(Point::new(2., 1., 0.)), Location::Boundary);
        sq.flip();
        assert_eq!(sq, make_xy_square());
    }

    #[test]
    fn test_flip_non_convex_keeps_outline() {
        let mut l = Polygon::new(vec![
            Point::new(0., 0., 0.),
            Point::new(0., 2., 0.),
            Point::new(0., 2., 1.),
            Point::new(0., 1., 1.),
            Point::new(0., 1., 2.),
            Point::new(0., 0., 2.),
        ])
        .unwrap();
        l.flip();
        assert!(l.normal().is_close(&Vector::new(-1., 0., 0.)));
        assert_eq!(l.vertices()[0], Point::new(0., 0., 2.));
        assert_eq!(l.locate(Point::new(0., 1.5, 1.5)), Location::Outside);
        assert_eq!(l.locate(Point::new(0., 0.5, 1.5)), Location::Inside);
        assert_eq!(l.locate(Point::new(0., 1., 1.5)), Location::Boundary);
        // Basis stays orthonormal and right-handed with the new normal
        let [u, v] = l.basis;
        assert!(u.dot(v).abs() < 1e-12);
        assert!(u.cross(v).is_close(&l.normal()));
    }
}
