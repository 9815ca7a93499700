//! Tick throughput benchmarks.
//!
//! - `integrate_single_step`: the pure kinematic step, no timeline write.
//! - `simulation_100_ticks/{n}`: a fresh simulation of `n` piloted objects
//!   advanced by 100 ticks, including continuum tracking and a loop wrap.
//!
//! Run with: `cargo bench --bench tick_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use timeloop_engine::prelude::*;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn setup_simulation(object_count: usize) -> Simulation {
    let mut sim = Simulation::new(SimulationConfig {
        total_ticks: 64,
        ..Default::default()
    });
    for i in 0..object_count {
        let offset = i as f64 * 3.0 - 500.0;
        let id = sim.spawn(
            SpaceTimePosition::new(i as u64 % 64, Vec2::new(offset, offset * 0.5), 0.0),
            SpaceSpeed::new(Vec2::new(1.0, -0.5), 0.01),
        );
        let pilot: Box<dyn Pilot> = if i % 2 == 0 {
            Box::new(PlayerController::default())
        } else {
            Box::new(WanderController::new(i as u64, 20, ControllerConfig::default()))
        };
        sim.attach_pilot(id, pilot).expect("object was just spawned");
        sim.set_input(id, PilotInput::new(Axis::Positive, Axis::Negative))
            .expect("object was just spawned");
    }
    sim
}

// ---------------------------------------------------------------------------
// Benchmark 1: pure integration step
// ---------------------------------------------------------------------------

fn bench_integrate(c: &mut Criterion) {
    let latest = LedgerRecord::new(
        SpaceTimePosition::new(10, Vec2::new(740.0, -20.0), 0.3),
        SpaceSpeed::new(Vec2::new(12.0, 1.0), 0.02),
    );
    let thrust = Thrust {
        translation: Vec2::new(0.1, 0.0),
        rotation: 0.01,
    };
    let half = Vec2::new(750.0, 500.0);

    c.bench_function("integrate_single_step", |b| {
        b.iter(|| black_box(integrate(black_box(&latest), thrust, 2000, half)));
    });
}

// ---------------------------------------------------------------------------
// Benchmark 2: full simulation ticks
// ---------------------------------------------------------------------------

fn bench_simulation_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_100_ticks");
    for object_count in [10usize, 100, 500] {
        group.bench_with_input(
            BenchmarkId::from_parameter(object_count),
            &object_count,
            |b, &count| {
                b.iter_batched(
                    || setup_simulation(count),
                    |mut sim| {
                        sim.run_ticks(100).expect("simulation ticks");
                        black_box(sim.elapsed())
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_integrate, bench_simulation_ticks);
criterion_main!(benches);
