use serde::{Deserialize, Serialize};

use crate::Vector;

/// First-order polar patterns, `gain(theta) = rho + (1 - rho) * cos(theta)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pattern {
    #[default]
    Omnidirectional,
    Subcardioid,
    Cardioid,
    Hypercardioid,
    FigureEight,
}

impl Pattern {
    /// Weight of the omnidirectional component.
    pub fn rho(&self) -> f64 {
        match self {
            Pattern::Omnidirectional => 1.0,
            Pattern::Subcardioid => 0.75,
            Pattern::Cardioid => 0.5,
            Pattern::Hypercardioid => 0.25,
            Pattern::FigureEight => 0.0,
        }
    }
}

/// Directivity of a source or microphone: a pattern oriented along `forward`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Directivity {
    pub pattern: Pattern,
    pub forward: Vector,
}

impl Directivity {
    pub fn new(pattern: Pattern, forward: Vector) -> Self {
        Self { pattern, forward }
    }

    pub fn omnidirectional() -> Self {
        Self::new(Pattern::Omnidirectional, Vector::new(1., 0., 0.))
    }

    pub fn is_omnidirectional(&self) -> bool {
        self.pattern == Pattern::Omnidirectional
    }

    /// Pressure gain towards `direction` (may be negative behind a figure-eight).
    pub fn gain(&self, direction: Vector) -> f64 {
        if self.is_omnidirectional() {
            return 1.0;
        }
        let Some(dir) = direction.normalize() else {
            return 1.0;
        };
        let Some(fwd) = self.forward.normalize() else {
            return 1.0;
        };
        let rho = self.pattern.rho();
        rho + (1.0 - rho) * dir.dot(fwd)
    }

    /// Energy gain towards `direction`.
    pub fn energy_gain(&self, direction: Vector) -> f64 {
        self.gain(direction).powi(2)
    }
}

impl Default for Directivity {
    fn default() -> Self {
        Self::omnidirectional()
    }
}
