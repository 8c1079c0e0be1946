use crate::sim::materials::{Bands, NUM_OCTAVE_BANDS};

/// Energy-time histogram of one microphone: `bins[k][band]` holds the energy
/// arriving in `[k * bin_size, (k + 1) * bin_size)`.
///
/// The histogram grows on demand, so its length is set by the latest arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bin_size: f64,
    bins: Vec<Bands>,
}

impl Histogram {
    pub fn new(bin_size: f64) -> Self {
        Self {
            bin_size,
            bins: Vec::new(),
        }
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn bins(&self) -> &[Bands] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Adds band energies arriving at `time` (seconds). Negative times are ignored.
    pub fn add(&mut self, time: f64, energy: &Bands) {
        if time.is_nan() || time < 0.0 {
            return;
        }
        let bin = (time / self.bin_size) as usize;
        if bin >= self.bins.len() {
            self.bins.resize(bin + 1, [0.0; NUM_OCTAVE_BANDS]);
        }
        for (b, e) in self.bins[bin].iter_mut().zip(energy) {
            *b += e;
        }
    }

    /// Adds the bins of `other`, which must use the same bin size.
    pub fn merge(&mut self, other: &Histogram) {
        if other.bins.len() > self.bins.len() {
            self.bins.resize(other.bins.len(), [0.0; NUM_OCTAVE_BANDS]);
        }
        for (a, b) in self.bins.iter_mut().zip(&other.bins) {
            for (x, y) in a.iter_mut().zip(b) {
                *x += y;
            }
        }
    }

    /// Total energy per band.
    pub fn total(&self) -> Bands {
        let mut total = [0.0; NUM_OCTAVE_BANDS];
        for bin in &self.bins {
            for (t, e) in total.iter_mut().zip(bin) {
                *t += e;
            }
        }
        total
    }

    /// Energy of one band per bin.
    pub fn band(&self, band: usize) -> Vec<f64> {
        self.bins.iter().map(|b| b[band]).collect()
    }

    /// End time of the last non-empty bin.
    pub fn duration(&self) -> f64 {
        let last = self
            .bins
            .iter()
            .rposition(|b| b.iter().any(|&e| e > 0.0))
            .map_or(0, |k| k + 1);
        last as f64 * self.bin_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_grows() {
        let mut h = Histogram::new(0.01);
        h.add(0.005, &[1.0; NUM_OCTAVE_BANDS]);
        h.add(0.0355, &[2.0; NUM_OCTAVE_BANDS]);
        assert_eq!(h.len(), 4);
        assert_eq!(h.bins()[0][0], 1.0);
        assert_eq!(h.bins()[3][5], 2.0);
        assert!((h.duration() - 0.04).abs() < 1e-12);
        h.add(-1.0, &[5.0; NUM_OCTAVE_BANDS]);
        assert_eq!(h.total()[0], 3.0);
    }

    #[test]
    fn test_merge() {
        let mut a = Histogram::new(0.01);
        a.add(0.0, &[1.0; NUM_OCTAVE_BANDS]);
        let mut b = Histogram::new(0.01);
        b.add(0.05, &[0.5; NUM_OCTAVE_BANDS]);
        b.add(0.0, &[1.0; NUM_OCTAVE_BANDS]);
        a.merge(&b);
        assert_eq!(a.len(), 6);
        assert_eq!(a.band(2)[0], 2.0);
        assert_eq!(a.total()[4], 2.5);
    }
}
