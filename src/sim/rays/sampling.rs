//! Launch directions and per-ray random streams.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Vector;

/// Independent generator for ray `index` of a run seeded with `seed`.
///
/// Each ray owns its stream, so results do not depend on how rays are
/// distributed over threads.
pub fn ray_rng(seed: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(index))
}

/// Jittered direction of ray `index` on a `nb_thetas x nb_phis` grid of
/// equal-area strata of the sphere.
pub fn sphere_direction<R: Rng>(index: usize, nb_thetas: usize, nb_phis: usize, rng: &mut R) -> Vector {
    let i = index / nb_phis;
    let j = index % nb_phis;
    let u: f64 = rng.r#gen();
    let v: f64 = rng.r#gen();
    let cos_theta = (1.0 - 2.0 * (i as f64 + u) / nb_thetas as f64).clamp(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * (j as f64 + v) / nb_phis as f64;
    Vector::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Jittered direction of ray `index` out of `count` equal sectors of the circle.
pub fn circle_direction<R: Rng>(index: usize, count: usize, rng: &mut R) -> Vector {
    let u: f64 = rng.r#gen();
    let phi = 2.0 * PI * (index as f64 + u) / count as f64;
    Vector::new(phi.cos(), phi.sin(), 0.0)
}

/// Launch direction of ray `index` in a room of dimension `dim`.
pub fn launch_direction<R: Rng>(
    dim: usize,
    index: usize,
    nb_thetas: usize,
    nb_phis: usize,
    rng: &mut R,
) -> Vector {
    if dim == 2 {
        circle_direction(index, nb_thetas * nb_phis, rng)
    } else {
        sphere_direction(index, nb_thetas, nb_phis, rng)
    }
}
