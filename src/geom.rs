pub mod bboxes;
pub mod containment;
pub mod planar;
pub mod point;
pub mod polygon;
pub mod ray;
pub mod vector;
pub mod visibility;
pub mod wall;

/// Geometric tolerance shared by every query (10 micrometers).
pub const EPS: f64 = 1e-5;
