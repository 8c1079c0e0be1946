//! Ray casting against walls.

use crate::geom::EPS;
use crate::geom::wall::{Isect, Wall};
use crate::{Point, Vector};

/// A ray defined by an origin point and a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vector,
}

/// Nearest wall hit along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index of the wall in the slice that was searched.
    pub wall: usize,
    pub point: Point,
    pub distance: f64,
}

impl Ray {
    /// Creates a new ray. The direction is normalized, `None` if it has zero length.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let direction = direction.normalize()?;
        Some(Self { origin, direction })
    }

    pub fn from_points(origin: Point, target: Point) -> Option<Self> {
        Self::new(origin, target - origin)
    }

    pub fn point_at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }

    /// Finds the closest wall hit within `max_distance`.
    ///
    /// Hits closer than EPS to the origin are ignored (the wall the ray just
    /// left). Grazing rays are rejected, while hits on wall edges count.
    pub fn nearest_hit(&self, walls: &[Wall], max_distance: f64) -> Option<Hit> {
        let end = self.point_at(max_distance);
        let mut nearest: Option<Hit> = None;
        for (i, wall) in walls.iter().enumerate() {
            if self.direction.dot(wall.normal()).abs() < 1e-10 {
                continue;
            }
            let (kind, point) = wall.intersection(self.origin, end);
            if kind == Isect::None {
                continue;
            }
            let Some(point) = point else { continue };
            let distance = self.origin.distance(&point);
            if distance < EPS {
                continue;
            }
            if nearest.is_none_or(|h| distance < h.distance) {
                nearest = Some(Hit {
                    wall: i,
                    point,
                    distance,
                });
            }
        }
        nearest
    }
}

/// Cosine of the angle between two vectors (0 if either has zero length).
pub fn cos_angle_between(a: Vector, b: Vector) -> f64 {
    let den = a.length() * b.length();
    if den < 1e-12 {
        0.0
    } else {
        (a.dot(b) / den).clamp(-1.0, 1.0)
    }
}

/// Distance from `p` to the infinite line through `origin` along `direction`.
pub fn dist_line_point(origin: Point, direction: Vector, p: Point) -> f64 {
    let Some(dir) = direction.normalize() else {
        return origin.distance(&p);
    };
    let v = p - origin;
    (v - dir * v.dot(dir)).length()
}

/// Closest approach of a segment to a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereHit {
    /// Distance from the segment start to the closest approach point.
    pub along: f64,
    /// Distance from the closest approach point to the sphere center.
    pub miss: f64,
}

/// Checks if the segment `a-b` passes within `radius` of `center`.
pub fn segment_sphere_hit(a: Point, b: Point, center: Point, radius: f64) -> Option<SphereHit> {
    let seg = b - a;
    let len = seg.length();
    let along = if len < 1e-12 {
        0.0
    } else {
        ((center - a).dot(seg) / len).clamp(0.0, len)
    };
    let closest = if len < 1e-12 {
        a
    } else {
        a + seg * (along / len)
    };
    let miss = closest.distance(&center);
    (miss <= radius).then_some(SphereHit { along, miss })
}
