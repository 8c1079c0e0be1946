//! Closed-form image lattice of an axis-aligned box.
//!
//! Every image of a box is reachable by a valid specular path, so no
//! back-tracing is needed. Wall indices follow [`Room::shoebox`]:
//! west, east, south, north, floor, ceiling.

use crate::error::{Result, SimError};
use crate::sim::image_source::{ImageSource, reach};
use crate::sim::materials::{Bands, NUM_OCTAVE_BANDS};
use crate::sim::room::Room;
use crate::{Point, Vector};

/// Images along one axis: `(u, l)` with coordinate `(1 - 2u) s + 2 l L`.
#[derive(Debug, Clone, Copy)]
struct AxisImage {
    u: usize,
    l: i64,
    /// Reflections off the low wall.
    low: usize,
    /// Reflections off the high wall.
    high: usize,
}

impl AxisImage {
    fn order(&self) -> usize {
        self.low + self.high
    }

    fn coordinate(&self, s: f64, length: f64) -> f64 {
        (1.0 - 2.0 * self.u as f64) * s + 2.0 * self.l as f64 * length
    }

    /// Generating walls in path order, alternating between both walls of the axis.
    fn walls(&self, low_wall: usize, high_wall: usize) -> Vec<usize> {
        let (mut first, mut second) = if self.high > self.low {
            (high_wall, low_wall)
        } else {
            (low_wall, high_wall)
        };
        let mut path = Vec::with_capacity(self.order());
        for _ in 0..self.order() {
            path.push(first);
            std::mem::swap(&mut first, &mut second);
        }
        path
    }
}

fn axis_images(max_order: usize) -> Vec<AxisImage> {
    let bound = max_order as i64;
    let mut out = Vec::new();
    for u in 0..2usize {
        for l in -bound..=bound + 1 {
            let low = (l - u as i64).unsigned_abs() as usize;
            let high = l.unsigned_abs() as usize;
            if low + high <= max_order {
                out.push(AxisImage { u, l, low, high });
            }
        }
    }
    out.sort_by_key(|a| (a.order(), a.u, a.l));
    out
}

pub(crate) type Lattice = (Vec<ImageSource>, Vec<Vec<Option<Vector>>>);

/// Enumerates the lattice up to the configured order.
pub(crate) fn generate(room: &Room, dims: [f64; 3], src: Point, mics: &[Point]) -> Result<Lattice> {
    let config = room.config();
    let max_order = config.max_order;
    let reflection: Vec<Bands> = (0..room.walls().len())
        .map(|w| room.wall_absorption(w).map(|a| (1.0 - a).sqrt()))
        .collect();

    let per_axis = axis_images(max_order);
    let s = src.to_array();

    let mut images: Vec<ImageSource> = Vec::new();
    let mut axes: Vec<[AxisImage; 3]> = Vec::new();
    for ix in &per_axis {
        for iy in &per_axis {
            for iz in &per_axis {
                let order = ix.order() + iy.order() + iz.order();
                if order > max_order {
                    continue;
                }
                let mut attenuation = [1.0; NUM_OCTAVE_BANDS];
                let counts = [ix.low, ix.high, iy.low, iy.high, iz.low, iz.high];
                for (wall, &n) in counts.iter().enumerate() {
                    if n == 0 {
                        continue;
                    }
                    for (a, r) in attenuation.iter_mut().zip(reflection[wall]) {
                        *a *= r.powi(n as i32);
                    }
                }
                let position = Point::new(
                    ix.coordinate(s[0], dims[0]),
                    iy.coordinate(s[1], dims[1]),
                    iz.coordinate(s[2], dims[2]),
                );
                if order > 0 && reach(&attenuation, position, mics) < config.ism_amplitude_threshold {
                    continue;
                }
                if images.len() >= config.max_image_sources {
                    return Err(SimError::resource_limit(format!(
                        "more than {} image sources in the box lattice",
                        config.max_image_sources
                    )));
                }
                let mut walls = ix.walls(0, 1);
                walls.extend(iy.walls(2, 3));
                walls.extend(iz.walls(4, 5));
                images.push(ImageSource {
                    position,
                    order,
                    walls,
                    attenuation,
                    parent: None,
                });
                axes.push([*ix, *iy, *iz]);
            }
        }
    }
    // Keep the real source first, then increasing order
    let mut index: Vec<usize> = (0..images.len()).collect();
    index.sort_by_key(|&i| images[i].order);
    let images: Vec<ImageSource> = index.iter().map(|&i| images[i].clone()).collect();
    let axes: Vec<[AxisImage; 3]> = index.iter().map(|&i| axes[i]).collect();

    let emission = mics
        .iter()
        .map(|mic| {
            images
                .iter()
                .zip(&axes)
                .map(|(image, axis)| {
                    // Unfold the path: an odd number of reflections flips the axis
                    let v = *mic - image.position;
                    let mut d = [v.dx, v.dy, v.dz];
                    for (k, a) in axis.iter().enumerate() {
                        if a.u == 1 {
                            d[k] = -d[k];
                        }
                    }
                    Some(Vector::new(d[0], d[1], d[2]))
                })
                .collect()
        })
        .collect();

    Ok((images, emission))
}
