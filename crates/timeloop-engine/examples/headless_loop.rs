//! Headless driver: a player ship, a wandering drone and the drone's escort,
//! run for a few loops of the main timeline with a summary per loop.
//!
//! Run with: `cargo run -p timeloop-engine --example headless_loop`
//!
//! Set `RUST_LOG=timeloop_core=debug` to watch continuums open and close.
//! Pass a JSON config document as the first argument to override defaults.

use timeloop_engine::prelude::*;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(json) => SimulationConfig::from_json(&json)?,
        None => SimulationConfig {
            total_ticks: 600,
            loop_limit: Some(3),
            ..Default::default()
        },
    };
    let total_ticks = config.total_ticks;
    let mut sim = Simulation::try_new(config)?;

    let player = sim.spawn(
        SpaceTimePosition::new(0, Vec2::ZERO, 0.0),
        SpaceSpeed::default(),
    );
    sim.attach_pilot(player, Box::new(PlayerController::default()))?;

    let drone = sim.spawn(
        SpaceTimePosition::new(total_ticks / 3, Vec2::new(-300.0, 200.0), 0.0),
        SpaceSpeed::new(Vec2::new(2.0, 0.0), 0.0),
    );
    sim.attach_pilot(
        drone,
        Box::new(WanderController::new(42, 30, ControllerConfig::default())),
    )?;

    // Scripted input: thrust and turn in alternating bursts.
    let mut escort = None;
    let mut opened = 0usize;
    loop {
        let step = sim.elapsed();
        let turn = if (step / 50) % 2 == 0 {
            Axis::Positive
        } else {
            Axis::Negative
        };
        sim.set_input(player, PilotInput::new(Axis::Positive, turn))?;

        let report = sim.tick()?;
        if report.halted {
            break;
        }
        opened += report.opened.len();

        if step == 100 {
            let launch = sim.latest_space_time_position(drone)?;
            escort = Some(sim.spawn_child(
                drone,
                launch,
                SpaceSpeed::new(Vec2::new(0.0, -1.0), 0.05),
            )?);
        }
        if step == 150 {
            // Erases the escort: the drone never lived to create it.
            sim.destroy(drone, 80)?;
        }

        if report.main_epoch == 0 {
            println!(
                "loop {} done: {} objects, {} continuums opened, last tick {:?}",
                sim.loops_completed(),
                sim.object_count(),
                opened,
                report.duration,
            );
        }
    }

    for (id, object) in sim.objects() {
        let timeline = object.timeline();
        let last = match object.latest_space_time_position() {
            Ok(stp) => format!("at ({:.1}, {:.1})", stp.position.x, stp.position.y),
            Err(error) => format!("hidden ({error})"),
        };
        println!(
            "{id}: {} records, {} continuums, {} trail markers, {}",
            timeline.len(),
            timeline.tracker().len(),
            object.trail_markers().len(),
            last,
        );
    }
    if let Some(escort) = escort {
        println!("escort {escort} destroyed: {}", sim.object(escort)?.is_destroyed());
    }
    println!("state hash: {}", sim.state_hash()?);
    Ok(())
}
