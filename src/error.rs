//! Error types for room construction and simulation.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while building a room or running a simulation.
///
/// Geometry and configuration errors are raised eagerly by constructors,
/// so a room is never returned half-built. Resource-limit errors are raised
/// while simulating and only abort the computation they belong to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid room, degenerate wall, or a point outside the room.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Image-source explosion beyond the configured ceiling, or a ray budget
    /// that exceeds the configured maximum.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Invalid parameter (absorption outside [0, 1], non-positive sampling
    /// rate or speed of sound, ...).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SimError {
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, Self::Geometry(_))
    }

    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Self::ResourceLimit(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
