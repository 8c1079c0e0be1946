use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Below this kernel or signal length, direct convolution is used.
const DIRECT_LIMIT: usize = 64;

/// FFT overlap-add convolution with a fixed kernel.
///
/// The kernel spectrum is computed once, so one convolver can be applied to
/// many signals.
pub struct Convolver {
    kernel: Vec<f64>,
    fft_size: usize,
    kernel_fft: Vec<Complex<f64>>,
    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,
}

impl Convolver {
    pub fn new(kernel: &[f64]) -> Self {
        // Next power of 2 >= 2 * kernel length
        let fft_size = (2 * kernel.len()).max(2).next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);

        let mut kernel_fft = zero_padded(kernel, fft_size);
        fft.process(&mut kernel_fft);

        Self {
            kernel: kernel.to_vec(),
            fft_size,
            kernel_fft,
            fft,
            ifft,
        }
    }

    /// Convolves `signal` with the kernel.
    ///
    /// Returns a vector of length `signal.len() + kernel.len() - 1`.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        if signal.is_empty() || self.kernel.is_empty() {
            return Vec::new();
        }
        if signal.len() <= DIRECT_LIMIT || self.kernel.len() <= DIRECT_LIMIT {
            return convolve_direct(signal, &self.kernel);
        }

        let output_len = signal.len() + self.kernel.len() - 1;
        let block_size = self.fft_size - self.kernel.len() + 1;
        let scale = 1.0 / self.fft_size as f64;
        let mut output = vec![0.0; output_len];

        for (i, chunk) in signal.chunks(block_size).enumerate() {
            let pos = i * block_size;
            let mut block = zero_padded(chunk, self.fft_size);
            self.fft.process(&mut block);
            for (b, k) in block.iter_mut().zip(self.kernel_fft.iter()) {
                *b *= k;
            }
            self.ifft.process(&mut block);

            let valid_len = (chunk.len() + self.kernel.len() - 1).min(output_len - pos);
            for (out, b) in output[pos..pos + valid_len].iter_mut().zip(block.iter()) {
                *out += b.re * scale;
            }
        }
        output
    }
}

fn zero_padded(values: &[f64], size: usize) -> Vec<Complex<f64>> {
    values
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .chain(std::iter::repeat_n(
            Complex::new(0.0, 0.0),
            size.saturating_sub(values.len()),
        ))
        .collect()
}

/// Linear convolution of `signal` and `kernel`.
pub fn convolve(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    if signal.len() <= DIRECT_LIMIT || kernel.len() <= DIRECT_LIMIT {
        return convolve_direct(signal, kernel);
    }
    // The shorter sequence becomes the kernel so that FFT blocks stay small
    if kernel.len() <= signal.len() {
        Convolver::new(kernel).apply(signal)
    } else {
        Convolver::new(signal).apply(kernel)
    }
}

fn convolve_direct(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let mut output = vec![0.0; signal.len() + kernel.len() - 1];
    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            output[i + j] += s * k;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convolve_known_result() {
        let result = convolve(&[1.0, 2.0, 3.0], &[1.0, 1.0]);
        let expected = [1.0, 3.0, 5.0, 3.0];
        assert_eq!(result.len(), expected.len());
        for (a, b) in result.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-10, "mismatch: {a} vs {b}");
        }
    }

    #[test]
    fn test_convolve_empty() {
        assert!(convolve(&[], &[1.0]).is_empty());
        assert!(convolve(&[1.0], &[]).is_empty());
    }

    #[test]
    fn test_convolve_long_delayed_impulse() {
        // Long enough to take the FFT path
        let signal: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.01).sin()).collect();
        let mut kernel = vec![0.0; 200];
        kernel[3] = 0.5;
        let result = convolve(&signal, &kernel);
        assert_eq!(result.len(), signal.len() + kernel.len() - 1);
        for (i, &s) in signal.iter().enumerate() {
            assert!((result[i + 3] - 0.5 * s).abs() < 1e-10, "mismatch at {i}");
        }
    }

    #[test]
    fn test_fft_matches_direct() {
        let signal: Vec<f64> = (0..500).map(|i| (i as f64 * 0.05).sin()).collect();
        let kernel: Vec<f64> = (0..100).map(|i| (-0.01 * i as f64).exp()).collect();
        let conv = Convolver::new(&kernel);
        let fft_result = conv.apply(&signal);
        let direct_result = convolve_direct(&signal, &kernel);
        assert_eq!(fft_result.len(), direct_result.len());
        for (a, b) in fft_result.iter().zip(direct_result.iter()) {
            assert!((a - b).abs() < 1e-8);
        }
        // Kernel longer than the signal
        let swapped = convolve(&kernel, &signal);
        for (a, b) in swapped.iter().zip(direct_result.iter()) {
            assert!((a - b).abs() < 1e-8);
        }
    }
}
