//! Room acoustic parameters measured on sampled impulse responses.

/// Schroeder backward-integrated energy decay curve in dB (0 dB at t = 0).
///
/// Returns an empty curve for a silent response.
pub fn schroeder_decay(rir: &[f64]) -> Vec<f64> {
    let mut remaining: Vec<f64> = rir.iter().map(|x| x * x).collect();
    for i in (0..remaining.len().saturating_sub(1)).rev() {
        remaining[i] += remaining[i + 1];
    }
    let total = remaining.first().copied().unwrap_or(0.0);
    if total <= 0.0 {
        return Vec::new();
    }
    remaining
        .iter()
        .map(|&e| 10.0 * (e.max(1e-300) / total).log10())
        .collect()
}

/// Reverberation time from a decay curve.
///
/// Fits a line to the decay curve between `start_db` and `end_db`,
/// then extrapolates to -60 dB.
fn rt_from_decay(decay: &[f64], time_resolution: f64, start_db: f64, end_db: f64) -> Option<f64> {
    let i_start = decay.iter().position(|&v| v <= start_db)?;
    let i_end = decay.iter().position(|&v| v <= end_db)?;
    if i_end <= i_start {
        return None;
    }

    // Linear regression on the decay curve between start and end
    let n = (i_end - i_start + 1) as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in decay.iter().enumerate().take(i_end + 1).skip(i_start) {
        let x = i as f64 * time_resolution;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let den = n * sum_xx - sum_x * sum_x;
    if den.abs() < 1e-300 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / den;
    if slope >= 0.0 {
        return None;
    }
    Some(-60.0 / slope)
}

/// Reverberation time of a sampled impulse response.
///
/// The Schroeder decay is fitted from -5 dB down to `-5 - decay_db` and
/// extrapolated to 60 dB of decay. Use `decay_db = 20.0` for T20 or `30.0`
/// for T30 when the response does not decay far enough for a full 60 dB.
pub fn measure_rt60(rir: &[f64], fs: f64, decay_db: f64) -> Option<f64> {
    if fs <= 0.0 || decay_db <= 0.0 {
        return None;
    }
    let decay = schroeder_decay(rir);
    rt_from_decay(&decay, 1.0 / fs, -5.0, -5.0 - decay_db)
}

/// Early decay time, fitted on the first 10 dB of decay.
pub fn edt(rir: &[f64], fs: f64) -> Option<f64> {
    if fs <= 0.0 {
        return None;
    }
    let decay = schroeder_decay(rir);
    rt_from_decay(&decay, 1.0 / fs, 0.0, -10.0)
}

fn early_late(rir: &[f64], fs: f64, boundary_s: f64) -> Option<(f64, f64)> {
    let boundary = (boundary_s * fs).round() as usize;
    if boundary >= rir.len() {
        return None;
    }
    let early = rir[..boundary].iter().map(|x| x * x).sum();
    let late = rir[boundary..].iter().map(|x| x * x).sum();
    Some((early, late))
}

/// C80: clarity (80 ms) in dB.
pub fn c80(rir: &[f64], fs: f64) -> Option<f64> {
    let (early, late) = early_late(rir, fs, 0.080)?;
    if late <= 0.0 {
        return None;
    }
    Some(10.0 * (early / late).log10())
}

/// D50: definition (50 ms), share of the energy arriving early.
pub fn d50(rir: &[f64], fs: f64) -> Option<f64> {
    let (early, late) = early_late(rir, fs, 0.050)?;
    let total = early + late;
    if total <= 0.0 {
        return None;
    }
    Some(early / total)
}
