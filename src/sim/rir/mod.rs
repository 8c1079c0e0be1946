//! Room impulse response synthesis.
//!
//! Image-source taps are placed up to the crossover time and the ray-traced
//! energy histogram is rendered as a noise tail from there on.

pub mod fractional_delay;
pub mod tail;

use log::{debug, warn};
use ndarray::Array2;

use crate::error::{Result, SimError};
use crate::sim::acoustics::filters::OctaveFilterBank;
use crate::sim::config::{AcousticMode, SimulationMode};
use crate::sim::image_source::{ImageSourceSet, Tap};
use crate::sim::materials::NUM_OCTAVE_BANDS;
use crate::sim::rays::histogram::Histogram;
use crate::sim::rays::simulation::TraceResult;
use crate::sim::room::Room;

use self::fractional_delay::FractionalDelay;

/// Share of dropped energy above which a warning is logged.
const TRUNCATION_WARNING: f64 = 0.01;

/// Impulse response between one source and one microphone.
#[derive(Debug, Clone, PartialEq)]
pub struct Rir {
    pub samples: Vec<f64>,
    pub fs: f64,
    /// Switch from image-source taps to the ray-traced tail, in seconds.
    pub crossover_time: f64,
    /// Energy that fell outside the response and was discarded.
    pub truncated_energy: f64,
    pub source: usize,
    pub microphone: usize,
    /// Number of image-source arrivals placed in the response.
    pub num_taps: usize,
}

impl Rir {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.fs
    }

    pub fn energy(&self) -> f64 {
        self.samples.iter().map(|x| x * x).sum()
    }

    /// Index of the largest absolute sample.
    pub fn peak_index(&self) -> Option<usize> {
        self.samples
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
    }
}

/// Impulse responses of all (source, microphone) pairs.
///
/// Each pair holds its own result, so a failed pair leaves the others usable.
#[derive(Debug, Clone)]
pub struct RirSet {
    num_sources: usize,
    num_microphones: usize,
    results: Vec<Result<Rir>>,
}

impl RirSet {
    /// `results` is ordered by source, then microphone.
    pub fn new(num_sources: usize, num_microphones: usize, results: Vec<Result<Rir>>) -> Self {
        debug_assert_eq!(results.len(), num_sources * num_microphones);
        Self {
            num_sources,
            num_microphones,
            results,
        }
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    pub fn num_microphones(&self) -> usize {
        self.num_microphones
    }

    pub fn get(&self, source: usize, microphone: usize) -> Option<&Result<Rir>> {
        if source >= self.num_sources || microphone >= self.num_microphones {
            return None;
        }
        self.results.get(source * self.num_microphones + microphone)
    }

    /// Results of every source at one microphone.
    pub fn for_microphone(&self, microphone: usize) -> Vec<&Result<Rir>> {
        (0..self.num_sources)
            .filter_map(|s| self.get(s, microphone))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Result<Rir>> {
        self.results.iter()
    }

    /// Responses of one source, one row per microphone, zero-padded to the longest.
    pub fn to_array(&self, source: usize) -> Result<Array2<f64>> {
        if source >= self.num_sources {
            return Err(SimError::configuration(format!(
                "no source with index {source} ({} sources)",
                self.num_sources
            )));
        }
        let rirs = (0..self.num_microphones)
            .map(|m| match self.get(source, m) {
                Some(Ok(rir)) => Ok(rir),
                Some(Err(e)) => Err(e.clone()),
                None => Err(SimError::configuration(format!(
                    "missing response for pair ({source}, {m})"
                ))),
            })
            .collect::<Result<Vec<&Rir>>>()?;
        let len = rirs.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut out = Array2::<f64>::zeros((rirs.len(), len));
        for (m, rir) in rirs.iter().enumerate() {
            for (i, &x) in rir.samples.iter().enumerate() {
                out[[m, i]] = x;
            }
        }
        Ok(out)
    }
}

/// Builds the impulse response of one pair from the engine outputs of its source.
pub fn synthesize(
    room: &Room,
    source: usize,
    microphone: usize,
    images: Option<&ImageSourceSet>,
    traced: Option<&TraceResult>,
) -> Result<Rir> {
    let config = room.config();
    let fs = config.fs;
    let mode = config.mode;
    let kernel = FractionalDelay::new(config.fractional_delay_length);

    let all_taps = match images {
        Some(set) if mode.uses_image_sources() => set.taps(room, microphone),
        _ => Vec::new(),
    };
    let histogram = match traced {
        Some(t) if mode.uses_ray_tracing() => t.histogram(microphone),
        _ => None,
    };

    let last_tap = all_taps.last().map_or(0.0, |t| t.delay);
    let crossover = match mode {
        SimulationMode::RayTracing => 0.0,
        SimulationMode::ImageSource => last_tap,
        SimulationMode::Hybrid => config.crossover_time.unwrap_or(last_tap),
    };
    let taps: Vec<Tap> = match mode {
        SimulationMode::Hybrid => all_taps.into_iter().filter(|t| t.delay <= crossover).collect(),
        _ => all_taps,
    };

    let natural = natural_duration(&taps, histogram, &kernel, fs);
    let len = match config.rir_duration {
        Some(d) => (d * fs).ceil() as usize,
        None => (natural * fs).ceil() as usize,
    };

    let seed = config.ray_tracing.seed;
    let bands = match config.acoustic_mode {
        AcousticMode::Scalar => 1,
        AcousticMode::FrequencyDependent => NUM_OCTAVE_BANDS,
    };
    let mut per_band: [Vec<f64>; NUM_OCTAVE_BANDS] = std::array::from_fn(|_| Vec::new());
    let mut truncated = 0.0;
    for (band, signal) in per_band.iter_mut().enumerate().take(bands) {
        let mut samples = vec![0.0; len];
        for tap in &taps {
            truncated += kernel.add(&mut samples, tap.delay * fs, tap.amplitude[band]);
        }
        if let Some(h) = histogram {
            let mut rng = tail::noise_rng(seed, source, microphone, band);
            let (noise, dropped) =
                tail::render(&h.band(band), h.bin_size(), fs, crossover, len, &mut rng);
            truncated += dropped;
            for (s, n) in samples.iter_mut().zip(noise) {
                *s += n;
            }
        }
        *signal = samples;
    }

    let samples = match config.acoustic_mode {
        AcousticMode::Scalar => std::mem::take(&mut per_band[0]),
        AcousticMode::FrequencyDependent => OctaveFilterBank::new(fs).synthesize(&per_band),
    };

    let rir = Rir {
        samples,
        fs,
        crossover_time: crossover,
        truncated_energy: truncated,
        source,
        microphone,
        num_taps: taps.len(),
    };
    let kept = rir.energy();
    if truncated > TRUNCATION_WARNING * (kept + truncated) {
        warn!(
            "pair ({source}, {microphone}): {:.1}% of the energy lies outside the {:.3} s response",
            100.0 * truncated / (kept + truncated),
            rir.duration()
        );
    }
    debug!(
        "pair ({source}, {microphone}): {} taps, crossover {:.4} s, {} samples",
        rir.num_taps,
        crossover,
        rir.len()
    );
    Ok(rir)
}

/// Time by which every arrival has died out.
fn natural_duration(taps: &[Tap], histogram: Option<&Histogram>, kernel: &FractionalDelay, fs: f64) -> f64 {
    let taps_end = taps
        .last()
        .map_or(0.0, |t| t.delay + (kernel.half_length() + 1) as f64 / fs);
    let tail_end = histogram.map_or(0.0, Histogram::duration);
    taps_end.max(tail_end)
}
