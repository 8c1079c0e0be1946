//! Physical models shared by the image-source and ray-tracing engines.

pub mod absorption;
pub mod reflection;
