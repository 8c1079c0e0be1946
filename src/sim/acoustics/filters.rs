use crate::sim::materials::{Bands, NUM_OCTAVE_BANDS, OCTAVE_BAND_FREQUENCIES};

/// Second-order (biquad) filter coefficients in Direct Form I.
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Runs a whole signal through the filter, starting from rest.
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        signal
            .iter()
            .map(|&x| {
                let y = self.b0 * x + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
                x2 = x1;
                x1 = x;
                y2 = y1;
                y1 = y;
                y
            })
            .collect()
    }
}

/// Designs a 2nd-order band-pass filter one octave wide around `center_freq`.
///
/// Returns `None` when the band's upper edge reaches the Nyquist frequency.
pub fn design_octave_bandpass(center_freq: f64, sample_rate: f64) -> Option<BiquadCoeffs> {
    let sqrt2 = std::f64::consts::SQRT_2;
    let f_low = center_freq / sqrt2;
    let f_high = center_freq * sqrt2;
    if f_high >= sample_rate / 2.0 {
        return None;
    }
    let bw = f_high - f_low;

    // Cookbook BPF formula (constant 0 dB peak gain)
    let w0 = 2.0 * std::f64::consts::PI * center_freq / sample_rate;
    let alpha = w0.sin() / (2.0 * (center_freq / bw));
    let a0 = 1.0 + alpha;

    Some(BiquadCoeffs {
        b0: alpha / a0,
        b1: 0.0,
        b2: -alpha / a0,
        a1: -2.0 * w0.cos() / a0,
        a2: (1.0 - alpha) / a0,
    })
}

/// Octave band-pass filters at the standard band centers (125 Hz to 4 kHz).
#[derive(Debug, Clone)]
pub struct OctaveFilterBank {
    filters: [Option<BiquadCoeffs>; NUM_OCTAVE_BANDS],
}

impl OctaveFilterBank {
    pub fn new(sample_rate: f64) -> Self {
        let filters = OCTAVE_BAND_FREQUENCIES.map(|fc| design_octave_bandpass(fc, sample_rate));
        for (fc, f) in OCTAVE_BAND_FREQUENCIES.iter().zip(filters.iter()) {
            if f.is_none() {
                log::debug!("octave band {fc} Hz is above the Nyquist range at {sample_rate} Hz");
            }
        }
        Self { filters }
    }

    /// Number of bands that can be represented at this sampling rate.
    pub fn num_active_bands(&self) -> usize {
        self.filters.iter().filter(|f| f.is_some()).count()
    }

    /// Filters `signal` through one band; silent for bands above Nyquist.
    pub fn filter_band(&self, signal: &[f64], band: usize) -> Vec<f64> {
        match self.filters.get(band).copied().flatten() {
            Some(coeffs) => coeffs.filter(signal),
            None => vec![0.0; signal.len()],
        }
    }

    /// Filters each per-band signal through its band and sums the results.
    ///
    /// The output has the length of the longest input.
    pub fn synthesize(&self, per_band: &[Vec<f64>; NUM_OCTAVE_BANDS]) -> Vec<f64> {
        let len = per_band.iter().map(Vec::len).max().unwrap_or(0);
        let mut out = vec![0.0; len];
        for (band, signal) in per_band.iter().enumerate() {
            for (o, y) in out.iter_mut().zip(self.filter_band(signal, band)) {
                *o += y;
            }
        }
        out
    }

    /// Energy of each band of a signal.
    pub fn band_energies(&self, signal: &[f64]) -> Bands {
        std::array::from_fn(|band| self.filter_band(signal, band).iter().map(|y| y * y).sum())
    }
}
