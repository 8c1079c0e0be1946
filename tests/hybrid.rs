mod common;

use anyhow::Result;
use common::{l_shape_3d, quick_config, uniform};
use room3d::metrics::measure_rt60;
use room3d::{Point, Room, ScatteringModel, SimulationConfig, SimulationMode, Source};

fn box_room(config: SimulationConfig) -> Result<Room> {
    let mut room = Room::shoebox([10.0, 10.0, 3.0], uniform(0.1), config)?;
    room.add_source(Point::new(5.0, 5.0, 1.5))?;
    room.add_microphone(Point::new(2.0, 2.0, 1.5))?;
    Ok(room)
}

#[test]
fn test_end_to_end_box() -> Result<()> {
    let mut config = quick_config();
    config.max_order = 3;
    let room = box_room(config)?;
    let fs = room.config().fs;
    let d = Point::new(5.0, 5.0, 1.5).distance(&Point::new(2.0, 2.0, 1.5));

    let taps = room.image_sources(0)?.taps(&room, 0);
    assert!((taps[0].delay - d / 343.0).abs() < 1.0 / fs);
    assert!(taps[1].amplitude[0] < taps[0].amplitude[0]);

    let rir = room.compute_rir(0, 0)?;
    let peak = rir.peak_index().expect("non-empty response");
    assert!((peak as f64 - d / 343.0 * fs).abs() <= 1.0);
    // The tail carries energy beyond the last image-source tap
    let tail_start = (rir.crossover_time * fs).ceil() as usize + 50;
    let tail: f64 = rir.samples[tail_start..].iter().map(|x| x * x).sum();
    assert!(tail > 0.0);
    Ok(())
}

#[test]
fn test_deterministic_with_seed() -> Result<()> {
    let mut config = quick_config();
    config.ray_tracing.seed = 11;
    let mut room = l_shape_3d(0.1, config.clone())?;
    room.add_source(Point::new(1.5, 1.2, 0.5))?;
    room.add_microphone(Point::new(3.0, 2.25, 0.6))?;

    let a = room.compute_rir(0, 0)?;
    let b = room.compute_rir(0, 0)?;
    assert_eq!(a.samples, b.samples);

    config.ray_tracing.seed = 12;
    room.set_config(config)?;
    let c = room.compute_rir(0, 0)?;
    assert_ne!(a.samples, c.samples);
    Ok(())
}

#[test]
fn test_energy_ledger() -> Result<()> {
    for model in [ScatteringModel::DiffuseRain, ScatteringModel::Stochastic] {
        let mut config = quick_config();
        config.mode = SimulationMode::RayTracing;
        config.ray_tracing.scattering_model = model;
        let material = room3d::Material::uniform("m", 0.15, 0.3)?;
        let mut room = Room::extruded(&common::L_FLOOR, 3.0, material, config)?;
        room.add_source(Point::new(1.5, 1.2, 0.5))?;
        room.add_microphone(Point::new(3.0, 2.25, 0.6))?;

        let traced = room.trace_rays(0)?;
        let stats = &traced.stats;
        assert_eq!(stats.num_rays, 1600);
        assert!((stats.emitted[0] - 1.0).abs() < 1e-9);
        assert!(stats.balance_error() < 1e-9, "{model:?}: {stats:?}");
        // Almost nothing is left when the rays stop
        assert!(stats.absorbed[0] + stats.scattered[0] > 0.9);
    }
    Ok(())
}

#[test]
fn test_rays_conserve_energy_without_absorption() -> Result<()> {
    // Rigid walls: only the time limit stops the rays
    let mut config = quick_config();
    config.mode = SimulationMode::RayTracing;
    config.ray_tracing.time_threshold = 0.2;
    let mut room = Room::shoebox([4.0, 3.0, 2.5], uniform(0.0), config)?;
    room.add_source(Point::new(1.0, 1.0, 1.0))?;
    room.add_microphone(Point::new(3.0, 2.0, 1.5))?;
    let stats = room.trace_rays(0)?.stats;
    assert!(stats.absorbed[0].abs() < 1e-12);
    assert!((stats.residual[0] - stats.emitted[0]).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_placement_on_boundary() -> Result<()> {
    let mut room = l_shape_3d(0.1, SimulationConfig::new())?;
    // On the floor, on an inner-corner wall, and inside the notch
    assert!(room.add_source(Point::new(5.0, 5.0, 0.0)).unwrap_err().is_geometry());
    assert!(room.add_source(Point::new(10.0, 2.0, 1.0)).unwrap_err().is_geometry());
    assert!(room.add_microphone(Point::new(15.0, 2.0, 1.0)).unwrap_err().is_geometry());

    let mut shoebox = Room::shoebox([10.0, 10.0, 3.0], uniform(0.1), SimulationConfig::new())?;
    let centroid = shoebox.centroid();
    shoebox.add_source(centroid)?;
    shoebox.add_microphone(centroid + room3d::Vector::new(1.0, 0.0, 0.0))?;
    Ok(())
}

#[test]
fn test_config_from_json() -> Result<()> {
    let json = r#"{
        "fs": 8000.0,
        "max_order": 2,
        "mode": "ImageSource",
        "rir_duration": 0.25,
        "ray_tracing": { "seed": 3, "nb_thetas": 10 }
    }"#;
    let config: SimulationConfig = serde_json::from_str(json)?;
    assert_eq!(config.fs, 8000.0);
    assert_eq!(config.mode, SimulationMode::ImageSource);
    assert_eq!(config.ray_tracing.seed, 3);
    assert_eq!(config.ray_tracing.nb_phis, 100);
    assert!((config.sound_speed - 343.0).abs() < 1e-12);

    let room = box_room(config)?;
    let rir = room.compute_rir(0, 0)?;
    assert_eq!(rir.len(), 2000);

    let bad: SimulationConfig = serde_json::from_str(r#"{"fs": -1.0}"#)?;
    assert!(Room::shoebox([3.0, 3.0, 3.0], uniform(0.1), bad).unwrap_err().is_configuration());
    Ok(())
}

#[test]
fn test_fractional_delay_peak_and_energy() -> Result<()> {
    let mut config = SimulationConfig::new();
    config.mode = SimulationMode::ImageSource;
    config.max_order = 0;
    let mut room = Room::shoebox([6.0, 5.0, 3.0], uniform(0.5), config)?;
    let src = Point::new(1.03, 1.71, 1.13);
    let mic = Point::new(4.58, 3.2, 1.9);
    room.add_source(src)?;
    room.add_microphone(mic)?;
    let d = src.distance(&mic);

    let rir = room.compute_rir(0, 0)?;
    let exact = d / 343.0 * room.config().fs;
    let peak = rir.peak_index().expect("non-empty response") as f64;
    assert!((peak - exact).abs() <= 1.0);
    assert!((rir.energy() * d * d - 1.0).abs() < 0.05);
    Ok(())
}

#[test]
fn test_rir_set_and_simulate() -> Result<()> {
    let mut config = quick_config();
    config.mode = SimulationMode::ImageSource;
    let mut room = Room::shoebox([5.0, 4.0, 3.0], uniform(0.3), config)?;
    room.add_source_with(Source::new(Point::new(1.0, 1.0, 1.0)).with_signal(vec![1.0, 0.5]))?;
    room.add_source(Point::new(4.0, 3.0, 2.0))?;
    room.add_microphone(Point::new(2.5, 2.0, 1.5))?;
    room.add_microphone(Point::new(3.5, 1.0, 1.0))?;

    let rirs = room.compute_rirs();
    assert_eq!(rirs.num_sources(), 2);
    assert_eq!(rirs.num_microphones(), 2);
    assert_eq!(rirs.for_microphone(1).len(), 2);
    let array = rirs.to_array(0)?;
    assert_eq!(array.nrows(), 2);

    let output = room.simulate(&rirs)?;
    assert_eq!(output.nrows(), 2);
    // Only the first source plays: its signal convolved with its responses
    for m in 0..2 {
        let rir = rirs.get(0, m).expect("pair").as_ref().expect("response");
        assert!(output.ncols() >= rir.len() + 1);
        for i in 0..rir.len() {
            let prev = if i > 0 { rir.samples[i - 1] } else { 0.0 };
            let expected = rir.samples[i] + 0.5 * prev;
            assert!((output[[m, i]] - expected).abs() < 1e-9);
        }
    }
    Ok(())
}

#[test]
fn test_measured_decay_is_plausible() -> Result<()> {
    let mut config = quick_config();
    config.max_order = 2;
    config.ray_tracing.scattering_model = ScatteringModel::Stochastic;
    let mut room = Room::shoebox([6.0, 5.0, 3.0], uniform(0.3), config)?;
    room.add_source(Point::new(1.5, 1.5, 1.2))?;
    room.add_microphone(Point::new(4.2, 3.1, 1.6))?;

    let rir = room.compute_rir(0, 0)?;
    let measured = measure_rt60(&rir.samples, rir.fs, 20.0).expect("enough decay");
    let eyring = room.rt60_eyring()[0];
    assert!(measured > 0.3 * eyring && measured < 3.0 * eyring, "{measured} vs {eyring}");
    Ok(())
}

fn rectangle_2d(alpha: f64, scattering: f64, config: SimulationConfig) -> Result<Room> {
    let corners = [[0., 0.], [6., 0.], [6., 5.], [0., 5.]];
    let material = room3d::Material::uniform("m", alpha, scattering)?;
    let mut room = Room::from_corners_2d(&corners, material, config)?;
    room.add_source(Point::new_2d(1.5, 1.5))?;
    room.add_microphone(Point::new_2d(4.0, 3.0))?;
    Ok(room)
}

#[test]
fn test_2d_direct_energy_matches_inverse_square() -> Result<()> {
    let d = Point::new_2d(1.5, 1.5).distance(&Point::new_2d(4.0, 3.0));
    for model in [ScatteringModel::DiffuseRain, ScatteringModel::Stochastic] {
        let mut config = quick_config();
        config.mode = SimulationMode::RayTracing;
        config.ray_tracing.nb_thetas = 100;
        config.ray_tracing.nb_phis = 100;
        config.ray_tracing.scattering_model = model;
        let room = rectangle_2d(1.0, 0.5, config)?;

        let traced = room.trace_rays(0)?;
        let total = traced.histograms[0].total()[0];
        assert!((total * d * d - 1.0).abs() < 0.05, "{model:?}: {}", total * d * d);
        assert!(traced.stats.balance_error() < 1e-9, "{model:?}: {:?}", traced.stats);
    }
    Ok(())
}

#[test]
fn test_2d_rays_stay_in_the_room() -> Result<()> {
    for model in [ScatteringModel::DiffuseRain, ScatteringModel::Stochastic] {
        let mut config = quick_config();
        config.mode = SimulationMode::RayTracing;
        config.ray_tracing.time_threshold = 5.0;
        config.ray_tracing.scattering_model = model;
        let room = rectangle_2d(0.2, 0.5, config)?;

        let traced = room.trace_rays(0)?;
        let stats = &traced.stats;
        assert!(stats.balance_error() < 1e-9, "{model:?}: {stats:?}");
        // Rays end on the energy threshold, not by leaking out of the plane
        assert!(stats.absorbed[0] + stats.scattered[0] > 0.95, "{model:?}: {stats:?}");
        assert!(stats.residual[0] < 0.01, "{model:?}: {stats:?}");
        assert!(traced.histograms[0].duration() > 0.1);
    }
    Ok(())
}

#[test]
fn test_2d_hybrid_response() -> Result<()> {
    let mut config = quick_config();
    config.max_order = 4;
    let room = rectangle_2d(0.2, 0.3, config)?;
    let fs = room.config().fs;
    let d = Point::new_2d(1.5, 1.5).distance(&Point::new_2d(4.0, 3.0));

    let rir = room.compute_rir(0, 0)?;
    assert!(rir.samples.iter().all(|x| x.is_finite()));
    let peak = rir.peak_index().expect("non-empty response");
    assert!((peak as f64 - d / 343.0 * fs).abs() <= 1.0);
    assert!(rir.crossover_time > d / 343.0);
    let tail_start = (rir.crossover_time * fs).ceil() as usize + 50;
    let tail: f64 = rir.samples[tail_start..].iter().map(|x| x * x).sum();
    assert!(tail > 0.0);
    Ok(())
}
