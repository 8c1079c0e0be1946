//! Visibility between points in a room.

use crate::Point;
use crate::geom::wall::{Isect, Wall};

/// Checks if two points can see each other.
///
/// The segment `a-b` is blocked by any wall it crosses, including crossings
/// on a wall edge. Contacts at the endpoints themselves (e.g. a point lying
/// on the wall it was reflected from) do not block.
pub fn is_visible(a: Point, b: Point, walls: &[Wall]) -> bool {
    walls.iter().all(|w| !blocks(w, a, b))
}

/// Same as [`is_visible`], but only the walls at `candidates` are tested.
pub fn is_visible_among(a: Point, b: Point, walls: &[Wall], candidates: &[usize]) -> bool {
    candidates
        .iter()
        .filter_map(|&i| walls.get(i))
        .all(|w| !blocks(w, a, b))
}

fn blocks(wall: &Wall, a: Point, b: Point) -> bool {
    matches!(wall.intersection(a, b).0, Isect::Valid | Isect::Boundary)
}
