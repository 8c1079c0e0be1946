//! Ray-tracing engine.

pub mod config;
pub mod histogram;
pub mod sampling;
pub mod simulation;

pub use config::{RayTracingConfig, ScatteringModel};
pub use histogram::Histogram;
pub use simulation::{TraceResult, TraceStats, trace};
