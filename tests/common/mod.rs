#![allow(dead_code)]

use anyhow::Result;
use room3d::{Material, Point, Room, SimulationConfig, Wall};

/// Floor outline of the L-shaped test room (20 x 10 m with a 10 x 5 m notch).
pub const L_FLOOR: [[f64; 2]; 6] = [
    [0., 0.],
    [0., 10.],
    [20., 10.],
    [20., 5.],
    [10., 5.],
    [10., 0.],
];

pub fn uniform(alpha: f64) -> Material {
    Material::uniform("test", alpha, 0.0).expect("valid coefficients")
}

/// L-shaped room extruded to 3 m.
pub fn l_shape_3d(alpha: f64, config: SimulationConfig) -> Result<Room> {
    Ok(Room::extruded(&L_FLOOR, 3.0, uniform(alpha), config)?)
}

pub fn l_shape_2d(alpha: f64, config: SimulationConfig) -> Result<Room> {
    Ok(Room::from_corners_2d(&L_FLOOR, uniform(alpha), config)?)
}

/// The six walls of an axis-aligned box, as a generic room would see them.
pub fn box_walls(dims: [f64; 3], material: &Material) -> Result<Vec<Wall>> {
    let [lx, ly, lz] = dims;
    let p = Point::new;
    let faces = [
        vec![p(0., 0., 0.), p(0., ly, 0.), p(0., ly, lz), p(0., 0., lz)],
        vec![p(lx, 0., 0.), p(lx, 0., lz), p(lx, ly, lz), p(lx, ly, 0.)],
        vec![p(0., 0., 0.), p(0., 0., lz), p(lx, 0., lz), p(lx, 0., 0.)],
        vec![p(0., ly, 0.), p(lx, ly, 0.), p(lx, ly, lz), p(0., ly, lz)],
        vec![p(0., 0., 0.), p(lx, 0., 0.), p(lx, ly, 0.), p(0., ly, 0.)],
        vec![p(0., 0., lz), p(0., ly, lz), p(lx, ly, lz), p(lx, 0., lz)],
    ];
    let walls = faces
        .into_iter()
        .enumerate()
        .map(|(i, pts)| Wall::new(&format!("face_{i}"), pts, material.clone()))
        .collect::<room3d::Result<Vec<_>>>()?;
    Ok(walls)
}

/// Configuration with a small ray budget for quick hybrid runs.
pub fn quick_config() -> SimulationConfig {
    let mut config = SimulationConfig::new();
    config.ray_tracing.nb_thetas = 40;
    config.ray_tracing.nb_phis = 40;
    config.ray_tracing.time_threshold = 1.0;
    config
}
