use crate::geom::EPS;
use crate::geom::point::Point;

/// Axis-aligned bounding box of a point set as `(min, max)` corners.
///
/// An empty set gives two points at the origin.
pub fn bounding_box(pts: &[Point]) -> (Point, Point) {
    if pts.is_empty() {
        return (Point::origin(), Point::origin());
    }
    let inf = f64::INFINITY;
    pts.iter().fold(
        (Point::new(inf, inf, inf), Point::new(-inf, -inf, -inf)),
        |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        },
    )
}

/// Checks whether a point is inside a bounding box (boundary included, within EPS).
pub fn is_point_inside_bbox(ptest: Point, pmin: Point, pmax: Point) -> bool {
    ptest.x >= pmin.x - EPS
        && ptest.x <= pmax.x + EPS
        && ptest.y >= pmin.y - EPS
        && ptest.y <= pmax.y + EPS
        && ptest.z >= pmin.z - EPS
        && ptest.z <= pmax.z + EPS
}

/// Length of the bounding box diagonal.
pub fn diagonal(pmin: Point, pmax: Point) -> f64 {
    pmin.distance(&pmax)
}
