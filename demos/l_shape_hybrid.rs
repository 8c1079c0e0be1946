use std::time::Instant;

use anyhow::Result;
use room3d::metrics::{c80, d50, measure_rt60};
use room3d::{Material, Point, Room, SimulationConfig, SimulationMode};

fn main() -> Result<()> {
    env_logger::init();
    println!("Hybrid impulse responses in an extruded L-shaped room.");

    // 20 x 10 m floor with a 10 x 5 m notch, 3 m high
    let floor = [
        [0., 0.],
        [0., 10.],
        [20., 10.],
        [20., 5.],
        [10., 5.],
        [10., 0.],
    ];
    let mut config = SimulationConfig::new();
    config.fs = 16000.0;
    config.max_order = 6;
    config.mode = SimulationMode::Hybrid;
    config.ray_tracing.nb_thetas = 100;
    config.ray_tracing.nb_phis = 100;

    let material = Material::uniform("walls", 0.1, 0.0)?;
    let mut room = Room::extruded(&floor, 3.0, material, config)?;
    room.add_source(Point::new(1.5, 1.2, 0.5))?;
    room.add_microphone(Point::new(3.0, 2.25, 0.6))?;
    room.add_microphone(Point::new(1.0, 1.0, 1.0))?;

    println!(
        "Volume {:.1} m3, surface {:.1} m2, Sabine RT60 {:.2} s, Eyring RT60 {:.2} s",
        room.volume(),
        room.surface(),
        room.rt60_sabine()[0],
        room.rt60_eyring()[0],
    );

    let t_sim = Instant::now();
    let rirs = room.compute_rirs();
    println!("Simulation time: {:.2}s", t_sim.elapsed().as_secs_f64());

    for (m, result) in rirs.for_microphone(0).into_iter().chain(rirs.for_microphone(1)).enumerate() {
        let rir = match result {
            Ok(rir) => rir,
            Err(e) => {
                println!("Microphone {m}: {e}");
                continue;
            }
        };
        println!(
            "Microphone {m}: {} samples ({:.3} s), {} taps, crossover {:.1} ms, truncated {:.2e}",
            rir.len(),
            rir.duration(),
            rir.num_taps,
            rir.crossover_time * 1000.0,
            rir.truncated_energy,
        );
        let fmt = |v: Option<f64>, unit: &str| v.map_or("n/a".to_string(), |x| format!("{x:.2}{unit}"));
        println!(
            "  RT60 (T20) {}, C80 {}, D50 {}",
            fmt(measure_rt60(&rir.samples, rir.fs, 20.0), " s"),
            fmt(c80(&rir.samples, rir.fs), " dB"),
            fmt(d50(&rir.samples, rir.fs), ""),
        );
    }

    Ok(())
}
