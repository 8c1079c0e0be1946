use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// How the scattered share of a ray's energy is handled at a wall hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScatteringModel {
    /// The scattered energy is sent straight to every visible microphone
    /// (Lambertian capture) and the ray continues specularly.
    #[default]
    DiffuseRain,
    /// The ray keeps its energy and reflects diffusely with probability equal
    /// to the scattering coefficient, specularly otherwise.
    Stochastic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayTracingConfig {
    /// Number of polar strata of launch directions.
    pub nb_thetas: usize,
    /// Number of azimuthal strata of launch directions.
    pub nb_phis: usize,
    /// Radius of the capture sphere around each microphone, in meters.
    pub receiver_radius: f64,
    /// Width of the energy histogram bins, in seconds.
    pub hist_bin_size: f64,
    /// A ray stops once its energy in every band falls below this fraction
    /// of its launch energy.
    pub energy_threshold: f64,
    /// A ray stops once its travel time exceeds this value, in seconds.
    pub time_threshold: f64,
    pub seed: u64,
    pub scattering_model: ScatteringModel,
    /// Rays per parallel work unit.
    pub chunk_size: usize,
    /// Upper bound on `nb_thetas * nb_phis`.
    pub max_rays: usize,
}

impl RayTracingConfig {
    pub fn new() -> Self {
        Self {
            nb_thetas: 100,
            nb_phis: 100,
            receiver_radius: 0.5,
            hist_bin_size: 0.004,
            energy_threshold: 1e-7,
            time_threshold: 10.0,
            seed: 0,
            scattering_model: ScatteringModel::DiffuseRain,
            chunk_size: 256,
            max_rays: 10_000_000,
        }
    }

    /// Total number of rays, saturating at `usize::MAX`.
    pub fn num_rays(&self) -> usize {
        self.nb_thetas.saturating_mul(self.nb_phis)
    }

    pub fn validate(&self) -> Result<()> {
        let Some(num_rays) = self.nb_thetas.checked_mul(self.nb_phis) else {
            return Err(SimError::resource_limit(format!(
                "{} x {} rays overflow the ray count",
                self.nb_thetas, self.nb_phis
            )));
        };
        if num_rays == 0 {
            return Err(SimError::configuration(
                "ray tracing needs at least one ray (nb_thetas and nb_phis must be > 0)",
            ));
        }
        if num_rays > self.max_rays {
            return Err(SimError::resource_limit(format!(
                "{num_rays} rays requested, the budget is {}",
                self.max_rays
            )));
        }
        let positive = [
            ("receiver_radius", self.receiver_radius),
            ("hist_bin_size", self.hist_bin_size),
            ("energy_threshold", self.energy_threshold),
            ("time_threshold", self.time_threshold),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(SimError::configuration(format!(
                    "{name} must be a positive number, got {v}"
                )));
            }
        }
        if self.chunk_size == 0 {
            return Err(SimError::configuration("chunk_size must be > 0"));
        }
        Ok(())
    }
}

impl Default for RayTracingConfig {
    fn default() -> Self {
        Self::new()
    }
}
