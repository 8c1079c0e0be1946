use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::sim::rays::config::RayTracingConfig;

/// Which engines contribute to the impulse response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationMode {
    /// Direct path and specular reflections only.
    ImageSource,
    /// Stochastic ray tracing only, from t = 0.
    RayTracing,
    /// Image sources up to the crossover time, ray-traced tail afterwards.
    #[default]
    Hybrid,
}

impl SimulationMode {
    pub fn uses_image_sources(&self) -> bool {
        matches!(self, SimulationMode::ImageSource | SimulationMode::Hybrid)
    }

    pub fn uses_ray_tracing(&self) -> bool {
        matches!(self, SimulationMode::RayTracing | SimulationMode::Hybrid)
    }
}

/// Acoustic simulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AcousticMode {
    /// One broadband response; material coefficients are averaged over the bands.
    #[default]
    Scalar,
    /// Per-octave-band responses filtered by a band-pass bank and summed.
    FrequencyDependent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Sampling rate in Hz.
    pub fs: f64,
    /// Speed of sound in m/s.
    pub sound_speed: f64,
    /// Maximum reflection order of the image-source method.
    pub max_order: usize,
    pub mode: SimulationMode,
    pub acoustic_mode: AcousticMode,
    pub air_absorption: bool,

    // Image sources
    /// Images whose best-case amplitude at any microphone is below this are dropped.
    pub ism_amplitude_threshold: f64,
    /// Ceiling on the number of images generated for one source.
    pub max_image_sources: usize,

    // Synthesis
    /// Crossover between image sources and ray tracing, in seconds.
    /// Defaults to the arrival of the last image-source tap.
    pub crossover_time: Option<f64>,
    /// Length of the impulse responses, in seconds.
    /// Defaults to the latest arrival.
    pub rir_duration: Option<f64>,
    /// Length of the windowed-sinc kernel used to place taps, in samples.
    pub fractional_delay_length: usize,

    pub ray_tracing: RayTracingConfig,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            fs: 16000.0,
            sound_speed: 343.0,
            max_order: 3,
            mode: SimulationMode::Hybrid,
            acoustic_mode: AcousticMode::Scalar,
            air_absorption: false,
            ism_amplitude_threshold: 1e-8,
            max_image_sources: 1_000_000,
            crossover_time: None,
            rir_duration: None,
            fractional_delay_length: 81,
            ray_tracing: RayTracingConfig::new(),
        }
    }

    /// Checks all parameters, including the ray-tracing ones when they are used.
    pub fn validate(&self) -> Result<()> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(SimError::configuration(format!(
                "sampling rate must be positive, got {}",
                self.fs
            )));
        }
        if !self.sound_speed.is_finite() || self.sound_speed <= 0.0 {
            return Err(SimError::configuration(format!(
                "speed of sound must be positive, got {}",
                self.sound_speed
            )));
        }
        if !self.ism_amplitude_threshold.is_finite() || self.ism_amplitude_threshold < 0.0 {
            return Err(SimError::configuration(
                "ism_amplitude_threshold must be a non-negative number",
            ));
        }
        if self.max_image_sources == 0 {
            return Err(SimError::configuration("max_image_sources must be > 0"));
        }
        if let Some(tc) = self.crossover_time
            && (!tc.is_finite() || tc < 0.0)
        {
            return Err(SimError::configuration(format!(
                "crossover time must be non-negative, got {tc}"
            )));
        }
        if let Some(d) = self.rir_duration
            && (!d.is_finite() || d <= 0.0)
        {
            return Err(SimError::configuration(format!(
                "RIR duration must be positive, got {d}"
            )));
        }
        if self.fractional_delay_length == 0 {
            return Err(SimError::configuration(
                "fractional_delay_length must be at least 1 sample",
            ));
        }
        if self.mode.uses_ray_tracing() {
            self.ray_tracing.validate()?;
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
