use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Turns one band of an energy-time histogram into a noise waveform.
///
/// Every bin becomes a run of random-sign samples whose squares add up to the
/// bin energy. Only the part of the histogram from `start` (seconds) onwards
/// is rendered; a bin straddling `start` keeps the share of its energy that
/// lies after it. Samples past `len` are dropped and their energy returned.
pub fn render(
    bins: &[f64],
    bin_size: f64,
    fs: f64,
    start: f64,
    len: usize,
    rng: &mut StdRng,
) -> (Vec<f64>, f64) {
    let mut out = vec![0.0; len];
    let mut dropped = 0.0;
    let mut carry = 0.0;
    let first_sample = (start * fs).ceil().max(0.0) as usize;

    for (k, &energy) in bins.iter().enumerate() {
        let t0 = k as f64 * bin_size;
        let t1 = (k + 1) as f64 * bin_size;
        if t1 <= start {
            continue;
        }
        let share = if t0 < start {
            (t1 - start) / bin_size
        } else {
            1.0
        };
        let energy = energy * share + carry;
        let n0 = ((t0 * fs).ceil() as usize).max(first_sample);
        let n1 = (t1 * fs).ceil() as usize;
        if n1 <= n0 {
            // Bin narrower than a sample
            carry = energy;
            continue;
        }
        carry = 0.0;
        if energy <= 0.0 {
            continue;
        }
        let amplitude = (energy / (n1 - n0) as f64).sqrt();
        for n in n0..n1 {
            let value = if rng.r#gen::<bool>() {
                amplitude
            } else {
                -amplitude
            };
            match out.get_mut(n) {
                Some(slot) => *slot += value,
                None => dropped += value * value,
            }
        }
    }
    dropped += carry;
    (out, dropped)
}

/// Noise generator of one (source, microphone, band) triple.
pub fn noise_rng(seed: u64, source: usize, microphone: usize, band: usize) -> StdRng {
    let key = ((source as u64) << 40) ^ ((microphone as u64) << 16) ^ band as u64;
    StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ key.wrapping_mul(0xBF58_476D_1CE4_E5B9))
}
