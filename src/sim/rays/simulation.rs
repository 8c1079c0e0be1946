//! Stochastic ray tracing for the late reverberant tail.
//!
//! Rays leave the source in stratified directions and bounce between the
//! walls until their energy or travel time runs out. Every crossing of a
//! microphone's capture sphere is logged in that microphone's energy-time
//! histogram, scaled so that the expected deposit of a direct ray is `1/r^2`,
//! which is also the energy of an image-source tap at distance `r`.

use std::f64::consts::PI;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::Result;
use crate::geom::EPS;
use crate::geom::ray::segment_sphere_hit;
use crate::geom::wall::Side;
use crate::sim::acoustics::source::Directivity;
use crate::sim::engine::absorption::{AirAbsorption, absorb};
use crate::sim::engine::reflection::{Hybrid, ReflectionModel};
use crate::sim::materials::{Bands, NUM_OCTAVE_BANDS};
use crate::sim::rays::config::{RayTracingConfig, ScatteringModel};
use crate::sim::rays::histogram::Histogram;
use crate::sim::rays::sampling::{launch_direction, ray_rng};
use crate::sim::room::Room;
use crate::{Point, Vector};

/// Energy bookkeeping of a ray-tracing run, per band.
///
/// Every unit of emitted energy ends up in exactly one of the other fields:
/// `emitted = absorbed + scattered + residual + threshold_loss`.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStats {
    pub num_rays: usize,
    pub emitted: Bands,
    /// Taken by the walls and the air.
    pub absorbed: Bands,
    /// Sent towards the microphones by diffuse rain.
    pub scattered: Bands,
    /// Still carried by rays that hit the time limit or left the room.
    pub residual: Bands,
    /// Carried by rays dropped below the energy threshold.
    pub threshold_loss: Bands,
}

impl TraceStats {
    fn new() -> Self {
        Self {
            num_rays: 0,
            emitted: [0.0; NUM_OCTAVE_BANDS],
            absorbed: [0.0; NUM_OCTAVE_BANDS],
            scattered: [0.0; NUM_OCTAVE_BANDS],
            residual: [0.0; NUM_OCTAVE_BANDS],
            threshold_loss: [0.0; NUM_OCTAVE_BANDS],
        }
    }

    fn merge(&mut self, other: &TraceStats) {
        self.num_rays += other.num_rays;
        let pairs = [
            (&mut self.emitted, &other.emitted),
            (&mut self.absorbed, &other.absorbed),
            (&mut self.scattered, &other.scattered),
            (&mut self.residual, &other.residual),
            (&mut self.threshold_loss, &other.threshold_loss),
        ];
        for (a, b) in pairs {
            add_to(a, b);
        }
    }

    /// Largest relative mismatch of the energy ledger over the bands.
    pub fn balance_error(&self) -> f64 {
        (0..NUM_OCTAVE_BANDS)
            .map(|b| {
                let out = self.absorbed[b] + self.scattered[b] + self.residual[b] + self.threshold_loss[b];
                (self.emitted[b] - out).abs() / self.emitted[b].max(f64::MIN_POSITIVE)
            })
            .fold(0.0, f64::max)
    }
}

/// Histograms of one source at every microphone.
#[derive(Debug, Clone)]
pub struct TraceResult {
    pub source: usize,
    /// One histogram per microphone, in the room's microphone order.
    pub histograms: Vec<Histogram>,
    pub stats: TraceStats,
    pub bin_size: f64,
}

impl TraceResult {
    pub fn histogram(&self, mic: usize) -> Option<&Histogram> {
        self.histograms.get(mic)
    }
}

/// Partial result of one chunk of rays.
struct Partial {
    histograms: Vec<Histogram>,
    stats: TraceStats,
}

impl Partial {
    fn new(num_mics: usize, bin_size: f64) -> Self {
        Self {
            histograms: vec![Histogram::new(bin_size); num_mics],
            stats: TraceStats::new(),
        }
    }

    fn merge(&mut self, other: &Partial) {
        for (a, b) in self.histograms.iter_mut().zip(&other.histograms) {
            a.merge(b);
        }
        self.stats.merge(&other.stats);
    }
}

/// Everything a ray needs to know about the scene, resolved once per run.
struct Scene<'a> {
    room: &'a Room,
    config: &'a RayTracingConfig,
    dim: usize,
    sound_speed: f64,
    source: Point,
    directivity: Directivity,
    mics: Vec<(Point, Directivity)>,
    /// Whether the source lies inside each microphone's capture sphere.
    source_inside: Vec<bool>,
    absorption: Vec<Bands>,
    scattering: Vec<Bands>,
    air: Option<AirAbsorption>,
    max_segment: f64,
}

impl Scene<'_> {
    /// Fraction of all launch directions that hit a capture sphere seen at distance `r`.
    fn capture_fraction(&self, r: f64) -> f64 {
        let radius = self.config.receiver_radius;
        if self.dim == 2 {
            (radius / r.max(radius)).asin() / PI
        } else {
            let ratio = radius * radius / (r * r).max(radius * radius);
            (1.0 - (1.0 - ratio).sqrt()) / 2.0
        }
    }

    /// Share of a Lambertian emission from a wall that reaches a capture sphere.
    fn lambert_fraction(&self, cos_theta: f64, r: f64) -> f64 {
        let radius = self.config.receiver_radius;
        if self.dim == 2 {
            cos_theta * (radius / r.max(radius)).asin()
        } else {
            let ratio = radius * radius / (r * r).max(radius * radius);
            2.0 * cos_theta * (1.0 - (1.0 - ratio).sqrt())
        }
    }

    /// Scale of a logged crossing at path length `r`, so that a direct ray
    /// deposits `1/r^2` on average.
    ///
    /// Path lengths are clamped to the capture radius. When the source sits
    /// inside the capture sphere every ray crosses it, and the level saturates
    /// at `1/R^2`.
    fn deposit_weight(&self, r: f64, source_inside: bool) -> f64 {
        let r = r.max(self.config.receiver_radius);
        let fraction = if source_inside {
            1.0
        } else {
            self.capture_fraction(r)
        };
        1.0 / (fraction * r * r)
    }

    fn air_factors(&self, distance: f64) -> Option<Bands> {
        self.air.map(|a| a.energy_factors(distance))
    }
}

/// Traces every ray of `source` and returns the per-microphone histograms.
pub fn trace(room: &Room, source: usize) -> Result<TraceResult> {
    let config = &room.config().ray_tracing;
    config.validate()?;

    let src = &room.sources()[source];
    let scene = Scene {
        room,
        config,
        dim: room.dim(),
        sound_speed: room.config().sound_speed,
        source: src.position,
        directivity: src.directivity,
        mics: room
            .microphones()
            .iter()
            .map(|m| (m.position, m.directivity))
            .collect(),
        source_inside: room
            .microphones()
            .iter()
            .map(|m| m.position.distance(&src.position) < config.receiver_radius)
            .collect(),
        absorption: (0..room.walls().len()).map(|w| room.wall_absorption(w)).collect(),
        scattering: (0..room.walls().len()).map(|w| room.wall_scattering(w)).collect(),
        air: room.air_absorption(),
        max_segment: 2.0 * room.max_distance() + 1.0,
    };

    let num_rays = config.num_rays();
    let indices: Vec<usize> = (0..num_rays).collect();
    info!(
        "tracing {num_rays} rays from source {source} ({:?})",
        config.scattering_model
    );

    // Chunks are reduced in order, so the sum does not depend on scheduling
    let partials: Vec<Partial> = indices
        .par_chunks(config.chunk_size)
        .map(|chunk| {
            let mut partial = Partial::new(scene.mics.len(), config.hist_bin_size);
            for &idx in chunk {
                trace_ray(&scene, idx, &mut partial);
            }
            partial
        })
        .collect();

    let mut total = Partial::new(scene.mics.len(), config.hist_bin_size);
    for partial in &partials {
        total.merge(partial);
    }

    debug!(
        "source {source}: emitted {:.4e}, absorbed {:.4e}, scattered {:.4e}, residual {:.4e}, \
         threshold loss {:.4e} (band 0), ledger error {:.2e}",
        total.stats.emitted[0],
        total.stats.absorbed[0],
        total.stats.scattered[0],
        total.stats.residual[0],
        total.stats.threshold_loss[0],
        total.stats.balance_error()
    );

    Ok(TraceResult {
        source,
        histograms: total.histograms,
        stats: total.stats,
        bin_size: config.hist_bin_size,
    })
}

fn trace_ray(scene: &Scene, index: usize, out: &mut Partial) {
    let config = scene.config;
    let mut rng = ray_rng(config.seed, index as u64);
    let mut direction = launch_direction(scene.dim, index, config.nb_thetas, config.nb_phis, &mut rng);

    let gain = scene.directivity.energy_gain(direction);
    let launch = gain / config.num_rays() as f64;
    let mut energy: Bands = [launch; NUM_OCTAVE_BANDS];
    let cutoff = launch * config.energy_threshold;
    let max_travel = config.time_threshold * scene.sound_speed;

    out.stats.num_rays += 1;
    add_to(&mut out.stats.emitted, &energy);
    if launch <= 0.0 {
        return;
    }

    let mut position = scene.source;
    let mut travelled = 0.0;

    loop {
        let Some(hit) = scene.room.next_wall_hit(position, direction) else {
            // Leaked through a seam between walls
            add_to(&mut out.stats.residual, &energy);
            return;
        };
        let segment = hit.distance.min(scene.max_segment);

        // Microphones crossed by this segment
        for (m, (mic, mic_directivity)) in scene.mics.iter().enumerate() {
            let Some(pass) = segment_sphere_hit(position, hit.point, *mic, config.receiver_radius) else {
                continue;
            };
            if pass.along >= segment {
                continue;
            }
            let r = travelled + pass.along;
            if r > max_travel {
                continue;
            }
            let mut deposit = energy;
            if let Some(air) = scene.air_factors(pass.along) {
                mul_by(&mut deposit, &air);
            }
            let source_inside = travelled == 0.0 && scene.source_inside[m];
            let weight = mic_directivity.energy_gain(-direction) * scene.deposit_weight(r, source_inside);
            for d in deposit.iter_mut() {
                *d *= weight;
            }
            out.histograms[m].add(r / scene.sound_speed, &deposit);
        }

        // Air absorption along the segment
        if let Some(air) = scene.air_factors(segment) {
            for b in 0..NUM_OCTAVE_BANDS {
                let kept = energy[b] * air[b];
                out.stats.absorbed[b] += energy[b] - kept;
                energy[b] = kept;
            }
        }

        travelled += segment;
        if travelled > max_travel {
            add_to(&mut out.stats.residual, &energy);
            return;
        }

        let w = hit.wall;
        let normal = scene.room.walls()[w].normal();
        let (reflected, absorbed) = absorb(&energy, &scene.absorption[w]);
        add_to(&mut out.stats.absorbed, &absorbed);
        energy = reflected;

        let scattering = scene.scattering[w];
        direction = match config.scattering_model {
            ScatteringModel::DiffuseRain => {
                let mut scattered = [0.0; NUM_OCTAVE_BANDS];
                for b in 0..NUM_OCTAVE_BANDS {
                    scattered[b] = energy[b] * scattering[b];
                    energy[b] -= scattered[b];
                }
                if scattered.iter().any(|&e| e > 0.0) {
                    add_to(&mut out.stats.scattered, &scattered);
                    diffuse_rain(scene, w, hit.point, travelled, &scattered, out);
                }
                direction.reflect(normal)
            }
            ScatteringModel::Stochastic => {
                let mean = scattering.iter().sum::<f64>() / NUM_OCTAVE_BANDS as f64;
                let next = Hybrid::new(mean).reflect(direction, normal, &mut rng);
                in_plane(scene.dim, next).unwrap_or_else(|| direction.reflect(normal))
            }
        };

        if energy.iter().all(|&e| e < cutoff) {
            add_to(&mut out.stats.threshold_loss, &energy);
            return;
        }
        position = hit.point;
    }
}

/// Sends the scattered energy of a wall hit straight to every microphone in view.
fn diffuse_rain(
    scene: &Scene,
    wall: usize,
    point: Point,
    travelled: f64,
    scattered: &Bands,
    out: &mut Partial,
) {
    let room = scene.room;
    let wall_ref = &room.walls()[wall];
    let normal = wall_ref.normal();
    let max_travel = scene.config.time_threshold * scene.sound_speed;

    for (m, (mic, mic_directivity)) in scene.mics.iter().enumerate() {
        if wall_ref.side(*mic) != Side::Front {
            continue;
        }
        let to_mic = *mic - point;
        let r = to_mic.length();
        if r < EPS || !room.is_visible(point, *mic) {
            continue;
        }
        let total = travelled + r;
        if total > max_travel {
            continue;
        }
        let cos_theta = (to_mic.dot(normal) / r).clamp(0.0, 1.0);
        let captured = scene.lambert_fraction(cos_theta, r);
        let weight =
            captured * mic_directivity.energy_gain(-to_mic) * scene.deposit_weight(total, false);
        let mut deposit = scattered.map(|e| e * weight);
        if let Some(air) = scene.air_factors(r) {
            mul_by(&mut deposit, &air);
        }
        out.histograms[m].add(total / scene.sound_speed, &deposit);
    }
}

/// Keeps a 2D room's rays in the z = 0 plane.
fn in_plane(dim: usize, direction: Vector) -> Option<Vector> {
    if dim == 2 {
        Vector::new(direction.dx, direction.dy, 0.0).normalize()
    } else {
        Some(direction)
    }
}

fn add_to(acc: &mut Bands, values: &Bands) {
    for (a, v) in acc.iter_mut().zip(values) {
        *a += v;
    }
}

fn mul_by(acc: &mut Bands, factors: &Bands) {
    for (a, f) in acc.iter_mut().zip(factors) {
        *a *= f;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::{SimulationConfig, SimulationMode};
    use crate::sim::materials::Material;

    fn small_room(alpha: f64, scattering: f64, model: ScatteringModel) -> Room {
        let mut config = SimulationConfig::new();
        config.mode = SimulationMode::RayTracing;
        config.ray_tracing.nb_thetas = 20;
        config.ray_tracing.nb_phis = 20;
        config.ray_tracing.chunk_size = 37;
        config.ray_tracing.time_threshold = 0.5;
        config.ray_tracing.scattering_model = model;
        let material = Material::uniform("m", alpha, scattering).unwrap();
        let mut room = Room::shoebox([4.0, 3.0, 2.5], material, config).unwrap();
        room.add_source(Point::new(1.0, 1.0, 1.2)).unwrap();
        room.add_microphone(Point::new(3.0, 2.0, 1.4)).unwrap();
        room
    }

    #[test]
    fn test_ledger_balances() {
        for model in [ScatteringModel::DiffuseRain, ScatteringModel::Stochastic] {
            let room = small_room(0.3, 0.4, model);
            let result = room.trace_rays(0).unwrap();
            assert_eq!(result.stats.num_rays, 400);
            assert!((result.stats.emitted[0] - 1.0).abs() < 1e-9);
            assert!(result.stats.balance_error() < 1e-9, "{:?}", result.stats);
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let room = small_room(0.2, 0.3, ScatteringModel::Stochastic);
        let a = room.trace_rays(0).unwrap();
        let b = room.trace_rays(0).unwrap();
        assert_eq!(a.histograms, b.histograms);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn test_chunk_size_does_not_change_result() {
        let mut room = small_room(0.2, 0.3, ScatteringModel::DiffuseRain);
        let a = room.trace_rays(0).unwrap();
        let mut config = room.config().clone();
        config.ray_tracing.chunk_size = 1000;
        room.set_config(config).unwrap();
        let b = room.trace_rays(0).unwrap();
        let (ta, tb) = (a.histograms[0].total(), b.histograms[0].total());
        assert!((ta[0] - tb[0]).abs() <= 1e-12 * ta[0].abs().max(1.0));
    }

    #[test]
    fn test_direct_energy_matches_inverse_square() {
        // Fully absorbing walls leave only the direct sound
        let mut room = small_room(1.0, 0.0, ScatteringModel::DiffuseRain);
        let mut config = room.config().clone();
        config.ray_tracing.nb_thetas = 80;
        config.ray_tracing.nb_phis = 80;
        room.set_config(config).unwrap();
        let result = room.trace_rays(0).unwrap();
        let d = Point::new(1.0, 1.0, 1.2).distance(&Point::new(3.0, 2.0, 1.4));
        let total = result.histograms[0].total()[0];
        assert!((total * d * d - 1.0).abs() < 0.15, "got {}", total * d * d);
    }

    #[test]
    fn test_microphone_inside_capture_sphere_saturates() {
        // The source sits inside the capture sphere: every ray crosses it once
        for d in [0.2, 0.4] {
            let mut config = SimulationConfig::new();
            config.mode = SimulationMode::RayTracing;
            config.ray_tracing.nb_thetas = 40;
            config.ray_tracing.nb_phis = 40;
            let radius = config.ray_tracing.receiver_radius;
            let material = Material::uniform("m", 1.0, 0.0).unwrap();
            let mut room = Room::shoebox([6.0, 5.0, 3.0], material, config).unwrap();
            room.add_source(Point::new(3.0, 2.5, 1.5)).unwrap();
            room.add_microphone(Point::new(3.0 + d, 2.5, 1.5)).unwrap();

            let total = room.trace_rays(0).unwrap().histograms[0].total()[0];
            assert!(total.is_finite());
            assert!((total * radius * radius - 1.0).abs() < 1e-9, "d = {d}: {total}");
        }
    }

    #[test]
    fn test_diffuse_rain_reaches_microphone() {
        let room = small_room(0.0, 1.0, ScatteringModel::DiffuseRain);
        let result = room.trace_rays(0).unwrap();
        assert!(result.stats.scattered[0] > 0.0);
        assert!(result.histograms[0].len() > 1);
    }

    #[test]
    fn test_capture_fraction() {
        let room = small_room(0.1, 0.0, ScatteringModel::DiffuseRain);
        let config = room.config().ray_tracing.clone();
        let scene = Scene {
            room: &room,
            config: &config,
            dim: 3,
            sound_speed: 343.0,
            source: Point::origin(),
            directivity: Directivity::default(),
            mics: Vec::new(),
            source_inside: Vec::new(),
            absorption: Vec::new(),
            scattering: Vec::new(),
            air: None,
            max_segment: 10.0,
        };
        // Far away, the cap is close to pi R^2 / (4 pi r^2)
        let r = 100.0;
        let expected = 0.25 / (4.0 * r * r);
        assert!((scene.capture_fraction(r) - expected).abs() / expected < 1e-3);
    }
}
