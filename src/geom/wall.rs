use crate::error::{Result, SimError};
use crate::geom::EPS;
use crate::geom::planar::{self, Location};
use crate::geom::polygon::Polygon;
use crate::random_id;
use crate::sim::materials::Material;
use crate::{Point, Vector};

/// Classification of a segment/wall intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isect {
    /// No intersection.
    None,
    /// The segment crosses the interior of the wall.
    Valid,
    /// One of the segment endpoints lies on the wall.
    Endpoint,
    /// The segment crosses the wall on its boundary (edge or corner).
    Boundary,
}

impl Isect {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Isect::None)
    }
}

/// Side of a wall relative to its normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// On the side the normal points to.
    Front,
    Back,
    On,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WallShape {
    /// Segment in the z = 0 plane (2D rooms).
    Segment([Point; 2]),
    /// Planar polygon (3D rooms).
    Polygon(Polygon),
}

/// A flat reflecting surface of a room.
#[derive(Debug, Clone)]
pub struct Wall {
    pub name: String,
    pub uid: String,
    pub material: Material,
    id: usize,
    shape: WallShape,
    normal: Vector,
}

impl Wall {
    /// Creates a 3D wall from its corners (at least 3, coplanar).
    pub fn new(name: &str, corners: Vec<Point>, material: Material) -> Result<Self> {
        material.validate()?;
        let polygon = Polygon::new(corners)
            .map_err(|e| SimError::geometry(format!("wall '{name}': {e}")))?;
        let normal = polygon.normal();
        Ok(Self {
            name: name.to_string(),
            uid: random_id(),
            material,
            id: 0,
            shape: WallShape::Polygon(polygon),
            normal,
        })
    }

    /// Creates a 2D wall, i.e. a segment in the z = 0 plane.
    ///
    /// The normal is the segment direction rotated clockwise by 90 degrees.
    pub fn new_2d(name: &str, a: [f64; 2], b: [f64; 2], material: Material) -> Result<Self> {
        material.validate()?;
        let (pa, pb) = (Point::new_2d(a[0], a[1]), Point::new_2d(b[0], b[1]));
        let dir = Vector::from_points(pa, pb);
        if dir.length() < EPS {
            return Err(SimError::geometry(format!(
                "wall '{name}': segment has zero length"
            )));
        }
        let normal = Vector::new(dir.dy, -dir.dx, 0.)
            .normalize()
            .ok_or_else(|| SimError::geometry(format!("wall '{name}': degenerate segment")))?;
        Ok(Self {
            name: name.to_string(),
            uid: random_id(),
            material,
            id: 0,
            shape: WallShape::Segment([pa, pb]),
            normal,
        })
    }

    /// Index of the wall in its room.
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    pub fn dim(&self) -> usize {
        match self.shape {
            WallShape::Segment(_) => 2,
            WallShape::Polygon(_) => 3,
        }
    }

    pub fn shape(&self) -> &WallShape {
        &self.shape
    }

    pub fn corners(&self) -> &[Point] {
        match &self.shape {
            WallShape::Segment(pts) => pts,
            WallShape::Polygon(poly) => poly.vertices(),
        }
    }

    /// Unit normal.
    pub fn normal(&self) -> Vector {
        self.normal
    }

    /// A point on the wall plane (its first corner).
    pub fn origin(&self) -> Point {
        self.corners()[0]
    }

    /// Area of a 3D wall, length of a 2D wall.
    pub fn area(&self) -> f64 {
        match &self.shape {
            WallShape::Segment([a, b]) => a.distance(b),
            WallShape::Polygon(poly) => poly.area(),
        }
    }

    pub fn centroid(&self) -> Point {
        Point::centroid(self.corners())
    }

    /// Signed distance of `p` from the wall plane (positive in front).
    pub fn signed_distance(&self, p: Point) -> f64 {
        Vector::from_points(self.origin(), p).dot(self.normal)
    }

    pub fn side(&self, p: Point) -> Side {
        let d = self.signed_distance(p);
        if d > EPS {
            Side::Front
        } else if d < -EPS {
            Side::Back
        } else {
            Side::On
        }
    }

    /// Mirror image of a point across the wall plane.
    pub fn reflect_point(&self, p: Point) -> Point {
        p - self.normal * (2.0 * self.signed_distance(p))
    }

    /// Mirror reflection of a direction on the wall plane.
    pub fn reflect_direction(&self, direction: Vector) -> Vector {
        direction.reflect(self.normal)
    }

    /// Intersection of the segment `p1-p2` with the wall.
    ///
    /// An endpoint lying on the wall takes precedence over a boundary hit.
    pub fn intersection(&self, p1: Point, p2: Point) -> (Isect, Option<Point>) {
        match &self.shape {
            WallShape::Segment([a, b]) => {
                let hit = planar::intersection_2d_segments(
                    [p1.x, p1.y],
                    [p2.x, p2.y],
                    [a.x, a.y],
                    [b.x, b.y],
                );
                match hit {
                    None => (Isect::None, None),
                    Some(h) => {
                        let kind = if h.at_first_end {
                            Isect::Endpoint
                        } else if h.at_second_end {
                            Isect::Boundary
                        } else {
                            Isect::Valid
                        };
                        (kind, Some(Point::new_2d(h.point[0], h.point[1])))
                    }
                }
            }
            WallShape::Polygon(poly) => {
                let d1 = self.signed_distance(p1);
                let d2 = self.signed_distance(p2);
                let on1 = d1.abs() < EPS;
                let on2 = d2.abs() < EPS;
                if on1 && on2 {
                    return (Isect::None, None); // Segment lies in the plane
                }
                if !on1 && !on2 && d1.signum() == d2.signum() {
                    return (Isect::None, None);
                }
                let t = d1 / (d1 - d2);
                let point = Point::new_between_2_points(p1, p2, t);
                match poly.locate(point) {
                    Location::Outside => (Isect::None, None),
                    _ if on1 || on2 => (Isect::Endpoint, Some(point)),
                    Location::Boundary => (Isect::Boundary, Some(point)),
                    Location::Inside => (Isect::Valid, Some(point)),
                }
            }
        }
    }

    pub fn intersects(&self, p1: Point, p2: Point) -> bool {
        self.intersection(p1, p2).0.is_hit()
    }

    /// Checks if both walls have the same corners (up to rotation and direction).
    pub fn same_as(&self, other: &Wall) -> bool {
        let a = self.corners();
        let b = other.corners();
        if a.len() != b.len() || self.dim() != other.dim() {
            return false;
        }
        let n = a.len();
        let Some(start) = b.iter().position(|p| p.is_close(&a[0])) else {
            return false;
        };
        let forward = (0..n).all(|i| a[i].is_close(&b[(start + i) % n]));
        let backward = (0..n).all(|i| a[i].is_close(&b[(start + n - i) % n]));
        forward || backward
    }

    /// Reverses the wall orientation.
    pub fn flip(&mut self) {
        match &mut self.shape {
            WallShape::Segment(pts) => pts.swap(0, 1),
            WallShape::Polygon(poly) => poly.flip(),
        }
        self.normal = -self.normal;
    }
}
