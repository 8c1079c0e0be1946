mod common;

use anyhow::Result;
use common::{box_walls, l_shape_2d, l_shape_3d, uniform};
use room3d::{Point, Room, SimulationConfig, SimulationMode};

fn ism_config(max_order: usize) -> SimulationConfig {
    let mut config = SimulationConfig::new();
    config.mode = SimulationMode::ImageSource;
    config.max_order = max_order;
    config
}

#[test]
fn test_direct_tap_independent_of_absorption() -> Result<()> {
    let src = Point::new(1.0, 1.5, 1.2);
    let mic = Point::new(4.0, 2.5, 1.7);
    let d = src.distance(&mic);
    for alpha in [0.0, 0.3, 0.9] {
        let mut room = Room::shoebox([6.0, 4.0, 3.0], uniform(alpha), ism_config(0))?;
        room.add_source(src)?;
        room.add_microphone(mic)?;
        let taps = room.image_sources(0)?.taps(&room, 0);
        assert_eq!(taps.len(), 1);
        assert!((taps[0].amplitude[0] - 1.0 / d).abs() < 1e-12);
        assert!((taps[0].delay - d / 343.0).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn test_l_shape_hides_direct_path() -> Result<()> {
    let mut room = l_shape_2d(0.1, ism_config(1))?;
    // Source in the lower wing, microphone in the right wing: the inner
    // corner blocks the line of sight.
    room.add_source(Point::new_2d(5.0, 2.0))?;
    room.add_microphone(Point::new_2d(17.0, 8.0))?;
    let set = room.image_sources(0)?;

    assert_eq!(set.images[0].order, 0);
    assert!(!set.is_visible(0, 0));
    // The reflection off the long top wall goes around the corner
    let top = set
        .images
        .iter()
        .position(|img| img.position.is_close(&Point::new_2d(5.0, 18.0)))
        .expect("image across the top wall");
    assert!(set.is_visible(0, top));
    assert!(set.taps(&room, 0).iter().all(|t| t.order == 1));
    Ok(())
}

#[test]
fn test_l_shape_3d_visibility() -> Result<()> {
    let mut room = l_shape_3d(0.1, ism_config(2))?;
    room.add_source(Point::new(5.0, 2.0, 1.0))?;
    room.add_microphone(Point::new(17.0, 8.0, 2.0))?;
    let set = room.image_sources(0)?;
    assert!(!set.is_visible(0, 0));
    assert!(!set.visible_images(0).is_empty());
    // Every heard image is reached through real reflections
    for i in set.visible_images(0) {
        assert!(set.images[i].order > 0);
    }
    Ok(())
}

#[test]
fn test_order_monotonicity() -> Result<()> {
    let mut previous = 0.0;
    for order in 0..=4 {
        let mut room = l_shape_3d(0.2, ism_config(order))?;
        room.add_source(Point::new(1.5, 1.2, 0.5))?;
        room.add_microphone(Point::new(3.0, 2.25, 0.6))?;
        let set = room.image_sources(0)?;
        let energy: f64 = set
            .taps(&room, 0)
            .iter()
            .map(|t| t.amplitude[0].powi(2))
            .sum();
        assert!(energy >= previous, "order {order}: {energy} < {previous}");
        previous = energy;
    }
    Ok(())
}

#[test]
fn test_shoebox_lattice_matches_generic_engine() -> Result<()> {
    let dims = [5.0, 4.0, 3.0];
    let material = uniform(0.25);
    let mut config = ism_config(3);
    config.ism_amplitude_threshold = 0.0;

    let mut fast = Room::shoebox(dims, material.clone(), config.clone())?;
    let mut generic = Room::new(box_walls(dims, &material)?, config)?;
    assert!(fast.shoebox_dims().is_some());
    assert!(generic.shoebox_dims().is_none());

    for room in [&mut fast, &mut generic] {
        room.add_source(Point::new(1.1, 1.3, 0.7))?;
        room.add_microphone(Point::new(3.7, 2.9, 1.9))?;
        room.add_microphone(Point::new(0.6, 3.1, 2.3))?;
    }
    let fast_set = fast.image_sources(0)?;
    let generic_set = generic.image_sources(0)?;

    for mic in 0..2 {
        let a = fast_set.taps(&fast, mic);
        let b = generic_set.taps(&generic, mic);
        assert_eq!(a.len(), b.len(), "microphone {mic}");
        for (x, y) in a.iter().zip(&b) {
            assert!((x.delay - y.delay).abs() < 1e-12);
            assert!((x.amplitude[0] - y.amplitude[0]).abs() < 1e-12);
            assert_eq!(x.order, y.order);
        }
    }
    Ok(())
}

#[test]
fn test_image_explosion_is_a_resource_error() -> Result<()> {
    let mut config = ism_config(8);
    config.max_image_sources = 100;
    let mut room = l_shape_3d(0.1, config)?;
    room.add_source(Point::new(1.5, 1.2, 0.5))?;
    room.add_microphone(Point::new(3.0, 2.25, 0.6))?;
    assert!(room.image_sources(0).unwrap_err().is_resource_limit());

    let rirs = room.compute_rirs();
    let pair = rirs.get(0, 0).expect("pair exists");
    assert!(pair.as_ref().unwrap_err().is_resource_limit());
    Ok(())
}
