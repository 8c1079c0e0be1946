//! Point-in-room containment testing using ray casting.
//!
//! A ray is cast from the test point and the wall crossings are counted: an
//! odd count means inside. Several directions are cast and the majority
//! wins; a direction that grazes a wall edge is discarded.

use crate::geom::EPS;
use crate::geom::bboxes::{bounding_box, diagonal, is_point_inside_bbox};
use crate::geom::planar::{self, Location};
use crate::geom::polygon::Polygon;
use crate::geom::wall::{Isect, Wall, WallShape};
use crate::{Point, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Outside,
    OnBoundary,
}

// Directions chosen away from the coordinate axes and diagonals, which are
// the most likely to run along edges of architectural rooms.
const DIRECTIONS_3D: [(f64, f64, f64); 5] = [
    (1.0, 0.1234, 0.0731),
    (-0.3712, 1.0, 0.2153),
    (0.1519, -0.2877, 1.0),
    (-1.0, -0.6181, -0.4142),
    (0.5773, 0.7071, -0.4472),
];

const DIRECTIONS_2D: [(f64, f64); 5] = [
    (1.0, 0.1234),
    (-0.3712, 1.0),
    (0.2877, -1.0),
    (-1.0, -0.6181),
    (0.7071, 0.5773),
];

/// Checks if a point lies on any of the walls.
pub fn is_point_at_boundary(ptest: Point, walls: &[Wall]) -> bool {
    walls.iter().any(|w| match w.shape() {
        WallShape::Segment([a, b]) => {
            planar::dist_point_segment([ptest.x, ptest.y], [a.x, a.y], [b.x, b.y]) < EPS
        }
        WallShape::Polygon(poly) => on_polygon(ptest, poly),
    })
}

fn on_polygon(ptest: Point, poly: &Polygon) -> bool {
    poly.signed_distance(ptest).abs() < EPS && poly.locate(ptest) != Location::Outside
}

/// Locates a point relative to the closed surface formed by `walls`.
///
/// `dim` selects planar (2) or spatial (3) ray directions.
pub fn contains(ptest: Point, walls: &[Wall], dim: usize) -> Containment {
    if walls.is_empty() {
        return Containment::Outside;
    }
    if is_point_at_boundary(ptest, walls) {
        return Containment::OnBoundary;
    }

    let corners: Vec<Point> = walls.iter().flat_map(|w| w.corners().to_vec()).collect();
    let (pmin, pmax) = bounding_box(&corners);
    if !is_point_inside_bbox(ptest, pmin, pmax) {
        return Containment::Outside;
    }
    let ray_length = diagonal(pmin, pmax) * 2.0 + 10.0;

    let directions: Vec<Vector> = if dim == 2 {
        DIRECTIONS_2D
            .iter()
            .map(|&(dx, dy)| Vector::new(dx, dy, 0.))
            .collect()
    } else {
        DIRECTIONS_3D
            .iter()
            .map(|&(dx, dy, dz)| Vector::new(dx, dy, dz))
            .collect()
    };

    let mut inside_votes = 0;
    let mut outside_votes = 0;
    for dir in directions {
        let Some(dir) = dir.normalize() else { continue };
        match cast_ray(ptest, ptest + dir * ray_length, walls) {
            Some(true) => inside_votes += 1,
            Some(false) => outside_votes += 1,
            None => {}
        }
    }

    if inside_votes > outside_votes {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

/// Counts crossings along `ptest-end`. `None` if the ray touches an edge.
fn cast_ray(ptest: Point, end: Point, walls: &[Wall]) -> Option<bool> {
    let mut crossings = 0;
    for wall in walls {
        match wall.intersection(ptest, end).0 {
            Isect::None => {}
            Isect::Valid => crossings += 1,
            Isect::Boundary | Isect::Endpoint => return None,
        }
    }
    Some(crossings % 2 == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::materials::Material;

    fn unit_box() -> Vec<Wall> {
        let p = |x, y, z| Point::new(x, y, z);
        let faces = [
            vec![p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)],
            vec![p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
            vec![p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
            vec![p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.)],
            vec![p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
            vec![p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)],
        ];
        faces
            .into_iter()
            .map(|pts| Wall::new("face", pts, Material::rigid()).unwrap())
            .collect()
    }

    #[test]
    fn test_point_inside_box() {
        let walls = unit_box();
        assert_eq!(contains(Point::new(0.5, 0.5, 0.5), &walls, 3), Containment::Inside);
        assert_eq!(contains(Point::new(0.01, 0.99, 0.5), &walls, 3), Containment::Inside);
    }

    #[test]
    fn test_point_outside_box() {
        let walls = unit_box();
        assert_eq!(contains(Point::new(1.5, 0.5, 0.5), &walls, 3), Containment::Outside);
        assert_eq!(contains(Point::new(-0.1, 0.5, 0.5), &walls, 3), Containment::Outside);
    }

    #[test]
    fn test_point_on_boundary() {
        let walls = unit_box();
        assert_eq!(contains(Point::new(0.5, 0.5, 0.0), &walls, 3), Containment::OnBoundary);
        assert_eq!(contains(Point::new(1.0, 1.0, 1.0), &walls, 3), Containment::OnBoundary);
        assert_eq!(contains(Point::new(1.0, 0.5, 0.5), &walls, 3), Containment::OnBoundary);
    }

    #[test]
    fn test_l_shape_2d() {
        let outline = [[0., 0.], [0., 10.], [20., 10.], [20., 5.], [10., 5.], [10., 0.]];
        let walls: Vec<Wall> = (0..outline.len())
            .map(|i| {
                Wall::new_2d(
                    "w",
                    outline[i],
                    outline[(i + 1) % outline.len()],
                    Material::rigid(),
                )
                .unwrap()
            })
            .collect();
        assert_eq!(contains(Point::new_2d(5., 5.), &walls, 2), Containment::Inside);
        assert_eq!(contains(Point::new_2d(15., 7.), &walls, 2), Containment::Inside);
        assert_eq!(contains(Point::new_2d(15., 2.), &walls, 2), Containment::Outside);
        assert_eq!(contains(Point::new_2d(10., 2.), &walls, 2), Containment::OnBoundary);
    }
}
