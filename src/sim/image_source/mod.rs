//! Image-source method for the direct path and early specular reflections.
//!
//! Images are expanded breadth-first, one reflection order at a time. Each
//! image keeps the index of the image it was mirrored from, so the path can
//! be walked back from a microphone through every generating wall.

pub mod shoebox;

use std::collections::HashSet;

use log::debug;
use rayon::prelude::*;

use crate::error::{Result, SimError};
use crate::geom::EPS;
use crate::geom::wall::{Isect, Side};
use crate::sim::materials::{Bands, NUM_OCTAVE_BANDS};
use crate::sim::room::Room;
use crate::{Point, Vector};

/// Arrivals closer than this (in seconds) are merged into one tap.
pub const TAP_MERGE_TOLERANCE: f64 = 1e-12;

/// A virtual source: the real source mirrored across a sequence of walls.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub position: Point,
    /// Number of reflections (0 for the real source).
    pub order: usize,
    /// Indices of the generating walls, first reflection first.
    pub walls: Vec<usize>,
    /// Product of the walls' pressure reflection coefficients, per band.
    pub attenuation: Bands,
    /// Index of the image this one was mirrored from.
    pub parent: Option<usize>,
}

impl ImageSource {
    fn root(position: Point) -> Self {
        Self {
            position,
            order: 0,
            walls: Vec::new(),
            attenuation: [1.0; NUM_OCTAVE_BANDS],
            parent: None,
        }
    }
}

/// One arrival at a microphone.
#[derive(Debug, Clone, PartialEq)]
pub struct Tap {
    /// Arrival time in seconds.
    pub delay: f64,
    /// Pressure amplitude per band.
    pub amplitude: Bands,
    /// Lowest reflection order among the merged arrivals.
    pub order: usize,
}

/// All images of one source and the microphones that can hear each of them.
#[derive(Debug, Clone)]
pub struct ImageSourceSet {
    pub source: usize,
    pub images: Vec<ImageSource>,
    /// `emission[mic][image]`: direction in which the real source emits the
    /// sound reaching `mic` through `image`, `None` when the path is invalid.
    emission: Vec<Vec<Option<Vector>>>,
}

impl ImageSourceSet {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_visible(&self, mic: usize, image: usize) -> bool {
        self.emission
            .get(mic)
            .and_then(|row| row.get(image))
            .is_some_and(Option::is_some)
    }

    /// Indices of the images heard at `mic`.
    pub fn visible_images(&self, mic: usize) -> Vec<usize> {
        (0..self.images.len())
            .filter(|&i| self.is_visible(mic, i))
            .collect()
    }

    /// Arrivals at `mic`, sorted by delay, with simultaneous arrivals summed.
    pub fn taps(&self, room: &Room, mic: usize) -> Vec<Tap> {
        let Some(row) = self.emission.get(mic) else {
            return Vec::new();
        };
        let source = &room.sources()[self.source];
        let microphone = &room.microphones()[mic];
        let c = room.config().sound_speed;
        let air = room.air_absorption();

        let mut taps: Vec<Tap> = self
            .images
            .iter()
            .zip(row)
            .filter_map(|(image, emission)| {
                let emission = (*emission)?;
                let d = image.position.distance(&microphone.position);
                if d < EPS {
                    return None;
                }
                let gain = source.directivity.gain(emission)
                    * microphone.directivity.gain(image.position - microphone.position);
                let air = air.map(|a| a.amplitude_factors(d));
                let mut amplitude = image.attenuation.map(|a| a * gain / d);
                if let Some(air) = air {
                    for (a, f) in amplitude.iter_mut().zip(air) {
                        *a *= f;
                    }
                }
                Some(Tap {
                    delay: d / c,
                    amplitude,
                    order: image.order,
                })
            })
            .collect();

        taps.sort_by(|a, b| a.delay.total_cmp(&b.delay));
        merge_simultaneous(taps)
    }
}

fn merge_simultaneous(taps: Vec<Tap>) -> Vec<Tap> {
    let mut merged: Vec<Tap> = Vec::with_capacity(taps.len());
    for tap in taps {
        match merged.last_mut() {
            Some(last) if (tap.delay - last.delay).abs() <= TAP_MERGE_TOLERANCE => {
                for (a, b) in last.amplitude.iter_mut().zip(tap.amplitude) {
                    *a += b;
                }
                last.order = last.order.min(tap.order);
            }
            _ => merged.push(tap),
        }
    }
    merged
}

/// Computes the image sources of `source` and their validity for every microphone.
pub fn compute(room: &Room, source: usize) -> Result<ImageSourceSet> {
    let src = room.sources()[source].position;
    let mics: Vec<Point> = room.microphones().iter().map(|m| m.position).collect();

    if let Some(dims) = room.shoebox_dims() {
        let (images, emission) = shoebox::generate(room, dims, src, &mics)?;
        debug!("shoebox: {} images for source {source}", images.len());
        return Ok(ImageSourceSet {
            source,
            images,
            emission,
        });
    }

    let images = generate(room, src, &mics)?;
    let emission: Vec<Vec<Option<Vector>>> = mics
        .par_iter()
        .map(|&mic| {
            (0..images.len())
                .map(|i| trace_back(room, &images, i, mic))
                .collect()
        })
        .collect();
    debug!(
        "{} images for source {source}, visible per microphone: {:?}",
        images.len(),
        emission
            .iter()
            .map(|row| row.iter().filter(|e| e.is_some()).count())
            .collect::<Vec<_>>()
    );

    Ok(ImageSourceSet {
        source,
        images,
        emission,
    })
}

/// Best-case amplitude of an image at the closest microphone.
pub(crate) fn reach(attenuation: &Bands, position: Point, mics: &[Point]) -> f64 {
    let Some(dist) = mics
        .iter()
        .map(|m| m.distance(&position))
        .min_by(f64::total_cmp)
    else {
        return f64::INFINITY;
    };
    attenuation.iter().copied().fold(0.0, f64::max) / dist.max(EPS)
}

/// Breadth-first expansion of the image tree.
fn generate(room: &Room, src: Point, mics: &[Point]) -> Result<Vec<ImageSource>> {
    let config = room.config();
    let walls = room.walls();
    let reflection: Vec<Bands> = (0..walls.len())
        .map(|w| room.wall_absorption(w).map(|a| (1.0 - a).sqrt()))
        .collect();

    let mut images = vec![ImageSource::root(src)];
    let mut level: Vec<usize> = vec![0];
    let mut seen: HashSet<Vec<usize>> = HashSet::new();

    for order in 1..=config.max_order {
        let children: Vec<Vec<ImageSource>> = level
            .par_iter()
            .map(|&parent_idx| {
                let parent = &images[parent_idx];
                let last_wall = parent.walls.last().copied();
                walls
                    .iter()
                    .enumerate()
                    .filter(|(w, wall)| {
                        Some(*w) != last_wall && wall.side(parent.position) == Side::Front
                    })
                    .filter_map(|(w, wall)| {
                        let mut attenuation = parent.attenuation;
                        for (a, r) in attenuation.iter_mut().zip(reflection[w]) {
                            *a *= r;
                        }
                        let position = wall.reflect_point(parent.position);
                        if reach(&attenuation, position, mics) < config.ism_amplitude_threshold {
                            return None;
                        }
                        let mut path = parent.walls.clone();
                        path.push(w);
                        Some(ImageSource {
                            position,
                            order,
                            walls: path,
                            attenuation,
                            parent: Some(parent_idx),
                        })
                    })
                    .collect()
            })
            .collect();

        let mut next = Vec::new();
        for child in children.into_iter().flatten() {
            if !seen.insert(child.walls.clone()) {
                continue;
            }
            if images.len() >= config.max_image_sources {
                return Err(SimError::resource_limit(format!(
                    "more than {} image sources at order {order}",
                    config.max_image_sources
                )));
            }
            next.push(images.len());
            images.push(child);
        }
        if next.is_empty() {
            break;
        }
        level = next;
    }
    Ok(images)
}

/// Walks the path of image `idx` back from `mic` to the real source.
///
/// Every leg must cross its generating wall and be unobstructed. Returns the
/// direction in which the real source emits along the path.
fn trace_back(room: &Room, images: &[ImageSource], idx: usize, mic: Point) -> Option<Vector> {
    let walls = room.walls();
    let mut target = mic;
    let mut current = idx;
    loop {
        let image = &images[current];
        let Some(parent) = image.parent else {
            if !room.is_visible(image.position, target) {
                return None;
            }
            return Some(target - image.position);
        };
        let wall = &walls[*image.walls.last()?];
        let (kind, point) = wall.intersection(target, image.position);
        let point = point?;
        if kind == Isect::None || point.distance(&target) < EPS {
            return None;
        }
        if !room.is_visible(point, target) {
            return None;
        }
        target = point;
        current = parent;
    }
}
