//! Room impulse response simulation.
//!
//! A [`Room`] is a closed set of [`Wall`]s with sources and microphones
//! placed inside. Impulse responses combine exact image-source arrivals for
//! the early part with a ray-traced stochastic tail.

pub mod error;
pub mod geom;
mod id;
pub mod sim;

// Prelude
pub use error::{Result, SimError};
pub use geom::point::Point;
pub use geom::polygon::Polygon;
pub use geom::vector::Vector;
pub use geom::wall::Wall;
pub use sim::acoustics::metrics;
pub use sim::acoustics::source::{Directivity, Pattern};
pub use sim::config::{AcousticMode, SimulationConfig, SimulationMode};
pub use sim::materials::{Material, MaterialLibrary};
pub use sim::rays::{RayTracingConfig, ScatteringModel};
pub use sim::rir::{Rir, RirSet};
pub use sim::room::{Microphone, Room, Source};
use id::random_id;
