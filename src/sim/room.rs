//! Rooms: closed sets of walls with sources and microphones inside.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::geom::bboxes::{bounding_box, diagonal};
use crate::geom::containment::{Containment, contains};
use crate::geom::planar::Location;
use crate::geom::ray::{Hit, Ray};
use crate::geom::wall::{Wall, WallShape};
use crate::geom::{EPS, visibility};
use crate::sim::acoustics::convolve::Convolver;
use crate::sim::acoustics::source::Directivity;
use crate::sim::config::{AcousticMode, SimulationConfig};
use crate::sim::engine::absorption::AirAbsorption;
use crate::sim::image_source::{self, ImageSourceSet};
use crate::sim::materials::{Bands, Material, NUM_OCTAVE_BANDS};
use crate::sim::rays::simulation::{self as rays, TraceResult};
use crate::sim::rir::{self, Rir, RirSet};
use crate::{Point, Vector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub position: Point,
    #[serde(default)]
    pub directivity: Directivity,
    /// Signal emitted by the source, used by [`Room::simulate`].
    #[serde(default)]
    pub signal: Option<Vec<f64>>,
}

impl Source {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            directivity: Directivity::omnidirectional(),
            signal: None,
        }
    }

    pub fn with_directivity(mut self, directivity: Directivity) -> Self {
        self.directivity = directivity;
        self
    }

    pub fn with_signal(mut self, signal: Vec<f64>) -> Self {
        self.signal = Some(signal);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Microphone {
    pub position: Point,
    #[serde(default)]
    pub directivity: Directivity,
}

impl Microphone {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            directivity: Directivity::omnidirectional(),
        }
    }

    pub fn with_directivity(mut self, directivity: Directivity) -> Self {
        self.directivity = directivity;
        self
    }
}

/// A closed polyhedral (3D) or polygonal (2D) room.
///
/// Wall normals point into the room once it is built.
#[derive(Debug, Clone)]
pub struct Room {
    walls: Vec<Wall>,
    dim: usize,
    config: SimulationConfig,
    sources: Vec<Source>,
    microphones: Vec<Microphone>,
    obstructing: Vec<usize>,
    bbox: (Point, Point),
    shoebox: Option<[f64; 3]>,
}

impl Room {
    /// Builds a room from its walls.
    ///
    /// All walls must have the same dimension and together enclose a volume
    /// (an area in 2D). Normals are reoriented to face the interior.
    pub fn new(walls: Vec<Wall>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let Some(first) = walls.first() else {
            return Err(SimError::geometry("a room needs walls"));
        };
        let dim = first.dim();
        if walls.iter().any(|w| w.dim() != dim) {
            return Err(SimError::geometry("cannot mix 2D and 3D walls in one room"));
        }
        let min_walls = if dim == 2 { 3 } else { 4 };
        if walls.len() < min_walls {
            return Err(SimError::geometry(format!(
                "a {dim}D room needs at least {min_walls} walls, got {}",
                walls.len()
            )));
        }

        let mut walls = walls;
        for (i, w) in walls.iter_mut().enumerate() {
            w.set_id(i);
        }
        let corners: Vec<Point> = walls.iter().flat_map(|w| w.corners().to_vec()).collect();
        let bbox = bounding_box(&corners);
        orient_walls_inward(&mut walls, dim, diagonal(bbox.0, bbox.1))?;
        check_closed(&walls)?;

        let obstructing = find_obstructing_walls(&walls, &corners);
        debug!(
            "room with {} walls ({dim}D), {} obstructing",
            walls.len(),
            obstructing.len()
        );

        Ok(Self {
            walls,
            dim,
            config,
            sources: Vec::new(),
            microphones: Vec::new(),
            obstructing,
            bbox,
            shoebox: None,
        })
    }

    /// Axis-aligned box `[0, lx] x [0, ly] x [0, lz]` with one material on every wall.
    pub fn shoebox(dims: [f64; 3], material: Material, config: SimulationConfig) -> Result<Self> {
        let materials = std::array::from_fn(|_| material.clone());
        Self::shoebox_with_materials(dims, materials, config)
    }

    /// Axis-aligned box with one material per wall, in the order
    /// west (x = 0), east, south (y = 0), north, floor (z = 0), ceiling.
    ///
    /// Image sources of a shoebox are enumerated analytically.
    pub fn shoebox_with_materials(
        dims: [f64; 3],
        materials: [Material; 6],
        config: SimulationConfig,
    ) -> Result<Self> {
        if dims.iter().any(|&l| !l.is_finite() || l <= EPS) {
            return Err(SimError::geometry(format!(
                "shoebox dimensions must be positive, got {dims:?}"
            )));
        }
        let [lx, ly, lz] = dims;
        let p = Point::new;
        let faces = [
            ("west", vec![p(0., 0., 0.), p(0., ly, 0.), p(0., ly, lz), p(0., 0., lz)]),
            ("east", vec![p(lx, 0., 0.), p(lx, 0., lz), p(lx, ly, lz), p(lx, ly, 0.)]),
            ("south", vec![p(0., 0., 0.), p(0., 0., lz), p(lx, 0., lz), p(lx, 0., 0.)]),
            ("north", vec![p(0., ly, 0.), p(lx, ly, 0.), p(lx, ly, lz), p(0., ly, lz)]),
            ("floor", vec![p(0., 0., 0.), p(lx, 0., 0.), p(lx, ly, 0.), p(0., ly, 0.)]),
            ("ceiling", vec![p(0., 0., lz), p(0., ly, lz), p(lx, ly, lz), p(lx, 0., lz)]),
        ];
        let walls = faces
            .into_iter()
            .zip(materials)
            .map(|((name, pts), material)| Wall::new(name, pts, material))
            .collect::<Result<Vec<_>>>()?;
        let mut room = Self::new(walls, config)?;
        room.shoebox = Some(dims);
        Ok(room)
    }

    /// Builds a 2D room from a closed outline, one wall per edge.
    pub fn from_corners_2d(
        corners: &[[f64; 2]],
        material: Material,
        config: SimulationConfig,
    ) -> Result<Self> {
        let n = corners.len();
        let walls = (0..n)
            .map(|i| {
                Wall::new_2d(
                    &format!("wall_{i}"),
                    corners[i],
                    corners[(i + 1) % n],
                    material.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(walls, config)
    }

    /// Builds a 3D room by extruding a floor outline up to `height`.
    pub fn extruded(
        corners: &[[f64; 2]],
        height: f64,
        material: Material,
        config: SimulationConfig,
    ) -> Result<Self> {
        if !height.is_finite() || height <= EPS {
            return Err(SimError::geometry(format!(
                "extrusion height must be positive, got {height}"
            )));
        }
        let n = corners.len();
        let floor: Vec<Point> = corners.iter().map(|&[x, y]| Point::new(x, y, 0.0)).collect();
        let ceiling: Vec<Point> = corners.iter().map(|&[x, y]| Point::new(x, y, height)).collect();
        let mut walls = vec![
            Wall::new("floor", floor.clone(), material.clone())?,
            Wall::new("ceiling", ceiling.clone(), material.clone())?,
        ];
        for i in 0..n {
            let j = (i + 1) % n;
            walls.push(Wall::new(
                &format!("side_{i}"),
                vec![floor[i], floor[j], ceiling[j], ceiling[i]],
                material.clone(),
            )?);
        }
        Self::new(walls, config)
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn microphones(&self) -> &[Microphone] {
        &self.microphones
    }

    /// Indices of the walls that can block a path inside the room.
    ///
    /// Only walls whose plane has room corners on both sides qualify, so this
    /// is empty for convex rooms.
    pub fn obstructing_walls(&self) -> &[usize] {
        &self.obstructing
    }

    pub fn is_convex(&self) -> bool {
        self.obstructing.is_empty()
    }

    /// Box dimensions if the room was built with [`Room::shoebox`].
    pub fn shoebox_dims(&self) -> Option<[f64; 3]> {
        self.shoebox
    }

    /// Length of the bounding box diagonal.
    pub fn max_distance(&self) -> f64 {
        diagonal(self.bbox.0, self.bbox.1)
    }

    pub fn contains(&self, p: Point) -> Containment {
        contains(p, &self.walls, self.dim)
    }

    fn check_placement(&self, what: &str, p: Point) -> Result<()> {
        if self.dim == 2 && p.z.abs() > EPS {
            return Err(SimError::geometry(format!(
                "{what} at {p} must lie in the z = 0 plane of a 2D room"
            )));
        }
        match self.contains(p) {
            Containment::Inside => Ok(()),
            Containment::OnBoundary => Err(SimError::geometry(format!(
                "{what} at {p} lies on a wall"
            ))),
            Containment::Outside => Err(SimError::geometry(format!(
                "{what} at {p} is outside the room"
            ))),
        }
    }

    /// Adds an omnidirectional source and returns its index.
    pub fn add_source(&mut self, position: Point) -> Result<usize> {
        self.add_source_with(Source::new(position))
    }

    pub fn add_source_with(&mut self, source: Source) -> Result<usize> {
        self.check_placement("source", source.position)?;
        self.sources.push(source);
        Ok(self.sources.len() - 1)
    }

    /// Adds an omnidirectional microphone and returns its index.
    pub fn add_microphone(&mut self, position: Point) -> Result<usize> {
        self.add_microphone_with(Microphone::new(position))
    }

    pub fn add_microphone_with(&mut self, microphone: Microphone) -> Result<usize> {
        self.check_placement("microphone", microphone.position)?;
        self.microphones.push(microphone);
        Ok(self.microphones.len() - 1)
    }

    /// Nearest wall hit by a ray leaving `origin` along `direction`.
    pub fn next_wall_hit(&self, origin: Point, direction: Vector) -> Option<Hit> {
        let ray = Ray::new(origin, direction)?;
        ray.nearest_hit(&self.walls, 2.0 * self.max_distance() + 1.0)
    }

    /// Checks if two points inside the room can see each other.
    pub fn is_visible(&self, a: Point, b: Point) -> bool {
        visibility::is_visible_among(a, b, &self.walls, &self.obstructing)
    }

    /// Absorption coefficients of a wall as used by the current acoustic mode.
    ///
    /// In scalar mode every band holds the mean over the bands.
    pub fn wall_absorption(&self, wall: usize) -> Bands {
        self.collapse(self.walls[wall].material.absorption)
    }

    /// Scattering coefficients of a wall as used by the current acoustic mode.
    pub fn wall_scattering(&self, wall: usize) -> Bands {
        self.collapse(self.walls[wall].material.scattering)
    }

    pub(crate) fn air_absorption(&self) -> Option<AirAbsorption> {
        if !self.config.air_absorption {
            return None;
        }
        let air = AirAbsorption::standard();
        Some(AirAbsorption {
            attenuation_per_meter: self.collapse(air.attenuation_per_meter),
        })
    }

    fn collapse(&self, values: Bands) -> Bands {
        match self.config.acoustic_mode {
            AcousticMode::FrequencyDependent => values,
            AcousticMode::Scalar => {
                [values.iter().sum::<f64>() / NUM_OCTAVE_BANDS as f64; NUM_OCTAVE_BANDS]
            }
        }
    }

    fn check_source(&self, source: usize) -> Result<()> {
        if source >= self.sources.len() {
            return Err(SimError::configuration(format!(
                "no source with index {source} ({} sources)",
                self.sources.len()
            )));
        }
        Ok(())
    }

    /// Image sources of one source, with their visibility from every microphone.
    pub fn image_sources(&self, source: usize) -> Result<ImageSourceSet> {
        self.check_source(source)?;
        image_source::compute(self, source)
    }

    /// Traces rays from one source and returns the microphone histograms.
    pub fn trace_rays(&self, source: usize) -> Result<TraceResult> {
        self.check_source(source)?;
        rays::trace(self, source)
    }

    /// Impulse response between one source and one microphone.
    pub fn compute_rir(&self, source: usize, microphone: usize) -> Result<Rir> {
        self.check_source(source)?;
        if microphone >= self.microphones.len() {
            return Err(SimError::configuration(format!(
                "no microphone with index {microphone} ({} microphones)",
                self.microphones.len()
            )));
        }
        let images = self.image_set_for_mode(source)?;
        let traced = self.trace_for_mode(source)?;
        rir::synthesize(self, source, microphone, images.as_ref(), traced.as_ref())
    }

    /// Impulse responses of every (source, microphone) pair.
    ///
    /// The engines run once per source; a failure only affects the pairs of
    /// that source.
    pub fn compute_rirs(&self) -> RirSet {
        let n_src = self.sources.len();
        let n_mic = self.microphones.len();
        info!("computing {} impulse responses", n_src * n_mic);

        let per_source: Vec<Vec<Result<Rir>>> = (0..n_src)
            .into_par_iter()
            .map(|s| {
                let engines = self
                    .image_set_for_mode(s)
                    .and_then(|images| Ok((images, self.trace_for_mode(s)?)));
                match engines {
                    Ok((images, traced)) => (0..n_mic)
                        .into_par_iter()
                        .map(|m| rir::synthesize(self, s, m, images.as_ref(), traced.as_ref()))
                        .collect(),
                    Err(e) => vec![Err(e); n_mic],
                }
            })
            .collect();

        RirSet::new(n_src, n_mic, per_source.into_iter().flatten().collect())
    }

    fn image_set_for_mode(&self, source: usize) -> Result<Option<ImageSourceSet>> {
        if self.config.mode.uses_image_sources() {
            Ok(Some(image_source::compute(self, source)?))
        } else {
            Ok(None)
        }
    }

    fn trace_for_mode(&self, source: usize) -> Result<Option<TraceResult>> {
        if self.config.mode.uses_ray_tracing() {
            Ok(Some(rays::trace(self, source)?))
        } else {
            Ok(None)
        }
    }

    /// Plays every source signal through the room.
    ///
    /// Returns one row per microphone: the sum over sources of the source
    /// signal convolved with the corresponding impulse response. Sources
    /// without a signal are silent.
    pub fn simulate(&self, rirs: &RirSet) -> Result<ndarray::Array2<f64>> {
        if rirs.num_sources() != self.sources.len() || rirs.num_microphones() != self.microphones.len()
        {
            return Err(SimError::configuration(
                "impulse responses do not match the room's sources and microphones",
            ));
        }
        if self.sources.iter().all(|s| s.signal.is_none()) {
            return Err(SimError::configuration("no source has a signal to simulate"));
        }

        let mut rows: Vec<Vec<f64>> = vec![Vec::new(); self.microphones.len()];
        for (s, source) in self.sources.iter().enumerate() {
            let Some(signal) = &source.signal else {
                continue;
            };
            let outputs: Vec<Result<Vec<f64>>> = (0..self.microphones.len())
                .into_par_iter()
                .map(|m| {
                    let rir = rirs.get(s, m).ok_or_else(|| {
                        SimError::configuration(format!("missing response for pair ({s}, {m})"))
                    })?;
                    let rir = rir.as_ref().map_err(Clone::clone)?;
                    Ok(Convolver::new(&rir.samples).apply(signal))
                })
                .collect();
            for (row, out) in rows.iter_mut().zip(outputs) {
                let out = out?;
                if row.len() < out.len() {
                    row.resize(out.len(), 0.0);
                }
                for (r, y) in row.iter_mut().zip(out) {
                    *r += y;
                }
            }
        }

        let len = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut output = ndarray::Array2::<f64>::zeros((rows.len(), len));
        for (m, row) in rows.iter().enumerate() {
            for (i, &y) in row.iter().enumerate() {
                output[[m, i]] = y;
            }
        }
        Ok(output)
    }

    /// Volume of the room (area for a 2D room).
    pub fn volume(&self) -> f64 {
        // Divergence theorem with inward normals
        let factor = if self.dim == 2 { 2.0 } else { 3.0 };
        -self
            .walls
            .iter()
            .map(|w| w.area() * w.normal().dot(Vector::from_a_point(w.origin())))
            .sum::<f64>()
            / factor
    }

    /// Area-weighted mean of the wall centroids.
    pub fn centroid(&self) -> Point {
        let surface = self.surface();
        let (x, y, z) = self.walls.iter().fold((0.0, 0.0, 0.0), |(x, y, z), w| {
            let c = w.centroid();
            let a = w.area();
            (x + a * c.x, y + a * c.y, z + a * c.z)
        });
        Point::new(x / surface, y / surface, z / surface)
    }

    /// Total wall area (perimeter for a 2D room).
    pub fn surface(&self) -> f64 {
        self.walls.iter().map(Wall::area).sum()
    }

    fn mean_absorption(&self) -> Bands {
        let surface = self.surface();
        std::array::from_fn(|b| {
            self.walls
                .iter()
                .enumerate()
                .map(|(i, w)| w.area() * self.wall_absorption(i)[b])
                .sum::<f64>()
                / surface
        })
    }

    fn rt60_estimate(&self, alpha_eff: impl Fn(f64) -> f64) -> Bands {
        let c = self.config.sound_speed;
        let v = self.volume();
        let s = self.surface();
        // Mean free path: 4V/S in 3D, pi*A/L in 2D
        let mean_free_path = if self.dim == 2 {
            std::f64::consts::PI * v / s
        } else {
            4.0 * v / s
        };
        let decay_60db = 6.0 * 10f64.ln();
        self.mean_absorption().map(|a| {
            let a = alpha_eff(a);
            if a <= 0.0 {
                f64::INFINITY
            } else {
                decay_60db * mean_free_path / (c * a)
            }
        })
    }

    /// Sabine reverberation time per band.
    pub fn rt60_sabine(&self) -> Bands {
        self.rt60_estimate(|a| a)
    }

    /// Eyring reverberation time per band.
    pub fn rt60_eyring(&self) -> Bands {
        self.rt60_estimate(|a| {
            if a >= 1.0 {
                f64::INFINITY
            } else {
                -(1.0 - a).ln()
            }
        })
    }
}

/// A point strictly inside the wall outline (the centroid may lie outside
/// non-convex walls).
fn interior_point(wall: &Wall) -> Point {
    match wall.shape() {
        WallShape::Segment([a, b]) => Point::new_between_2_points(*a, *b, 0.5),
        WallShape::Polygon(poly) => {
            let centroid = poly.centroid();
            if poly.locate(centroid) == Location::Inside {
                return centroid;
            }
            let pts = poly.vertices();
            (1..pts.len() - 1)
                .map(|i| Point::centroid(&[pts[0], pts[i], pts[i + 1]]))
                .find(|p| poly.locate(*p) == Location::Inside)
                .unwrap_or(centroid)
        }
    }
}

fn orient_walls_inward(walls: &mut [Wall], dim: usize, size: f64) -> Result<()> {
    let step = (1e-4 * size).max(10.0 * EPS);
    let flips: Vec<Result<bool>> = walls
        .iter()
        .map(|w| {
            let p = interior_point(w);
            let n = w.normal();
            if contains(p + n * step, walls, dim) == Containment::Inside {
                Ok(false)
            } else if contains(p - n * step, walls, dim) == Containment::Inside {
                Ok(true)
            } else {
                Err(SimError::geometry(format!(
                    "wall '{}' does not bound the room interior (is the room closed?)",
                    w.name
                )))
            }
        })
        .collect();
    for (wall, flip) in walls.iter_mut().zip(flips) {
        if flip? {
            wall.flip();
        }
    }
    Ok(())
}

/// The area-weighted normals of a closed surface sum to zero.
fn check_closed(walls: &[Wall]) -> Result<()> {
    let surface: f64 = walls.iter().map(Wall::area).sum();
    let flux = walls
        .iter()
        .fold(Vector::zero(), |acc, w| acc + w.normal() * w.area());
    if flux.length() > EPS * surface.max(1.0) {
        return Err(SimError::geometry(format!(
            "walls do not form a closed room (net normal {flux:.6})"
        )));
    }
    Ok(())
}

fn find_obstructing_walls(walls: &[Wall], corners: &[Point]) -> Vec<usize> {
    walls
        .iter()
        .enumerate()
        .filter(|(_, w)| {
            let front = corners.iter().any(|&c| w.signed_distance(c) > EPS);
            let back = corners.iter().any(|&c| w.signed_distance(c) < -EPS);
            front && back
        })
        .map(|(i, _)| i)
        .collect()
}
