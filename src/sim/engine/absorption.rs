use crate::sim::materials::{Bands, NUM_OCTAVE_BANDS};

/// Per-band energy left after hitting a surface with the given absorption.
///
/// Returns `(reflected, absorbed)`.
pub fn absorb(energy: &Bands, absorption: &Bands) -> (Bands, Bands) {
    let mut reflected = [0.0; NUM_OCTAVE_BANDS];
    let mut absorbed = [0.0; NUM_OCTAVE_BANDS];
    for b in 0..NUM_OCTAVE_BANDS {
        absorbed[b] = energy[b] * absorption[b];
        reflected[b] = energy[b] - absorbed[b];
    }
    (reflected, absorbed)
}

/// Air absorption model based on ISO 9613-1.
///
/// Applies distance-dependent attenuation per frequency band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirAbsorption {
    /// Attenuation coefficients in dB/m per octave band.
    pub attenuation_per_meter: Bands,
}

impl AirAbsorption {
    /// Creates an air absorption model for standard conditions (20°C, 50% RH).
    pub fn standard() -> Self {
        // Pure-tone attenuation at 20°C, 50% RH, 101.325 kPa (ISO 9613-1:1993)
        Self {
            attenuation_per_meter: [0.000440, 0.001310, 0.002728, 0.004665, 0.009887, 0.029666],
        }
    }

    /// No attenuation at all.
    pub fn none() -> Self {
        Self {
            attenuation_per_meter: [0.0; NUM_OCTAVE_BANDS],
        }
    }

    /// Energy multiplier per band after travelling `distance` meters.
    pub fn energy_factors(&self, distance: f64) -> Bands {
        self.attenuation_per_meter
            .map(|db_per_m| 10.0_f64.powf(-db_per_m * distance / 10.0))
    }

    /// Pressure multiplier per band after travelling `distance` meters.
    pub fn amplitude_factors(&self, distance: f64) -> Bands {
        self.energy_factors(distance).map(f64::sqrt)
    }
}
