use std::f64::consts::PI;

/// Places arrivals between samples with a Hann-windowed sinc kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionalDelay {
    length: usize,
}

impl FractionalDelay {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of samples the kernel extends past its center.
    pub fn half_length(&self) -> usize {
        self.length / 2
    }

    /// Kernel weight at `x` samples from the exact arrival time.
    pub fn weight(&self, x: f64) -> f64 {
        let half = self.length as f64 / 2.0;
        if x.abs() >= half && self.length > 1 {
            return 0.0;
        }
        let window = 0.5 * (1.0 + (2.0 * PI * x / self.length as f64).cos());
        sinc(x) * window
    }

    /// Adds an arrival of `amplitude` at fractional sample `position`.
    ///
    /// Kernel samples that fall outside `buffer` are dropped; their energy is
    /// returned.
    pub fn add(&self, buffer: &mut [f64], position: f64, amplitude: f64) -> f64 {
        if self.length == 1 {
            return add_sample(buffer, position.round() as i64, amplitude);
        }
        let center = position.round() as i64;
        let half = self.half_length() as i64;
        let mut dropped = 0.0;
        for n in center - half..=center + half {
            let w = self.weight(n as f64 - position);
            if w == 0.0 {
                continue;
            }
            dropped += add_sample(buffer, n, amplitude * w);
        }
        dropped
    }
}

fn add_sample(buffer: &mut [f64], n: i64, value: f64) -> f64 {
    match usize::try_from(n).ok().and_then(|i| buffer.get_mut(i)) {
        Some(slot) => {
            *slot += value;
            0.0
        }
        None => value * value,
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}
