use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Number of octave bands used for frequency-dependent simulation (125 Hz to 4 kHz).
pub const NUM_OCTAVE_BANDS: usize = 6;

/// Center frequencies of the octave bands in Hz.
pub const OCTAVE_BAND_FREQUENCIES: [f64; NUM_OCTAVE_BANDS] =
    [125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0];

/// One value per octave band.
pub type Bands = [f64; NUM_OCTAVE_BANDS];

/// Acoustic surface material with per-octave-band absorption and scattering.
///
/// A scalar material is simply one whose coefficients are equal in every band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Energy absorption coefficients per octave band, in [0, 1].
    pub absorption: Bands,
    /// Scattering coefficients per octave band, in [0, 1].
    pub scattering: Bands,
}

impl Material {
    pub fn new(name: &str, absorption: Bands, scattering: Bands) -> Result<Self> {
        let material = Self {
            name: name.to_string(),
            absorption,
            scattering,
        };
        material.validate()?;
        Ok(material)
    }

    /// Creates a material with the same coefficients in all bands.
    pub fn uniform(name: &str, absorption: f64, scattering: f64) -> Result<Self> {
        Self::new(
            name,
            [absorption; NUM_OCTAVE_BANDS],
            [scattering; NUM_OCTAVE_BANDS],
        )
    }

    /// Perfectly reflective, perfectly specular surface.
    pub fn rigid() -> Self {
        Self {
            name: "rigid".to_string(),
            absorption: [0.0; NUM_OCTAVE_BANDS],
            scattering: [0.0; NUM_OCTAVE_BANDS],
        }
    }

    /// Checks that every coefficient is a finite number in [0, 1].
    pub fn validate(&self) -> Result<()> {
        let check = |kind: &str, values: &Bands| -> Result<()> {
            for (band, &v) in values.iter().enumerate() {
                if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                    return Err(SimError::configuration(format!(
                        "material '{}': {kind} coefficient {v} in band {band} is outside [0, 1]",
                        self.name
                    )));
                }
            }
            Ok(())
        };
        check("absorption", &self.absorption)?;
        check("scattering", &self.scattering)
    }

    /// True if absorption or scattering varies across bands.
    pub fn is_frequency_dependent(&self) -> bool {
        let varies = |v: &Bands| v.iter().any(|&x| (x - v[0]).abs() > 1e-12);
        varies(&self.absorption) || varies(&self.scattering)
    }

    /// Pressure reflection coefficient per band: `sqrt(1 - absorption)`.
    pub fn reflection_amplitude(&self) -> Bands {
        self.absorption.map(|a| (1.0 - a).sqrt())
    }

    pub fn mean_absorption(&self) -> f64 {
        self.absorption.iter().sum::<f64>() / NUM_OCTAVE_BANDS as f64
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::rigid()
    }
}

/// Named acoustic materials.
#[derive(Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Like `get`, but fails with a configuration error for unknown names.
    pub fn require(&self, name: &str) -> Result<Material> {
        self.get(name)
            .cloned()
            .ok_or_else(|| SimError::configuration(format!("unknown material '{name}'")))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Library with a few common room surfaces (typical published values).
    pub fn with_presets() -> Self {
        let presets: [(&str, Bands, Bands); 6] = [
            (
                "concrete",
                [0.01, 0.01, 0.02, 0.02, 0.02, 0.03],
                [0.10, 0.10, 0.10, 0.10, 0.10, 0.10],
            ),
            (
                "glass",
                [0.18, 0.06, 0.04, 0.03, 0.02, 0.02],
                [0.05, 0.05, 0.05, 0.05, 0.05, 0.05],
            ),
            (
                "gypsum",
                [0.29, 0.10, 0.05, 0.04, 0.07, 0.09],
                [0.10, 0.10, 0.10, 0.10, 0.10, 0.10],
            ),
            (
                "carpet",
                [0.02, 0.06, 0.14, 0.37, 0.60, 0.65],
                [0.40, 0.40, 0.40, 0.50, 0.50, 0.50],
            ),
            (
                "wood",
                [0.15, 0.11, 0.10, 0.07, 0.06, 0.07],
                [0.10, 0.10, 0.10, 0.10, 0.10, 0.10],
            ),
            (
                "acoustic_ceiling",
                [0.15, 0.20, 0.30, 0.45, 0.55, 0.60],
                [0.30, 0.30, 0.30, 0.30, 0.30, 0.30],
            ),
        ];

        let mut lib = Self::new();
        for (name, absorption, scattering) in presets {
            lib.add(Material {
                name: name.to_string(),
                absorption,
                scattering,
            });
        }
        lib
    }
}
