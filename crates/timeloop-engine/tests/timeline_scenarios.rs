//! End-to-end scenarios through the public simulation API.

use timeloop_engine::prelude::*;

fn config(total_ticks: u64) -> SimulationConfig {
    SimulationConfig {
        total_ticks,
        ..Default::default()
    }
}

fn drifting(vx: f64) -> (SpaceTimePosition, SpaceSpeed) {
    (
        SpaceTimePosition::new(0, Vec2::ZERO, 0.0),
        SpaceSpeed::new(Vec2::new(vx, 0.0), 0.0),
    )
}

// ---------------------------------------------------------------------------
// Full loop
// ---------------------------------------------------------------------------

#[test]
fn one_full_loop_returns_to_main_epoch_zero_in_a_new_continuum() {
    let mut sim = Simulation::new(config(100));
    let (stp, speed) = drifting(1.0);
    let ship = sim.spawn(stp, speed);

    let mut opened_at = Vec::new();
    for _ in 0..100 {
        let report = sim.tick().unwrap();
        for (entity, continuum) in report.opened {
            assert_eq!(entity, ship);
            opened_at.push((continuum, sim.propagation_self_epoch(ship).unwrap()));
        }
    }

    let latest = sim.latest_space_time_position(ship).unwrap();
    assert_eq!(latest.main_epoch, 0);
    assert_eq!(latest.position, Vec2::new(100.0, 0.0));
    assert_eq!(sim.propagation_self_epoch(ship).unwrap(), 100);
    assert_eq!(opened_at, vec![(ContinuumId::new(1), 100)]);

    let timeline = sim.object(ship).unwrap().timeline();
    let first = timeline.tracker().continuum(ContinuumId::new(0)).unwrap();
    assert_eq!(first.last_main_epoch, Some(99));
    assert_eq!(first.last_self_epoch, Some(99));
    let second = timeline.tracker().continuum(ContinuumId::new(1)).unwrap();
    assert_eq!(second.anchor_self_epoch, 100);
    assert_eq!(second.first_main_epoch, 0);
}

#[test]
fn main_epoch_query_prefers_latest_loop() {
    let mut sim = Simulation::new(config(10));
    let (stp, speed) = drifting(1.0);
    let ship = sim.spawn(stp, speed);
    sim.run_ticks(23).unwrap();

    // Main epoch 2 was visited at self-epochs 2, 12 and 22.
    assert_eq!(
        sim.continuum_covering_main_epoch(ship, 2).unwrap(),
        Some((ContinuumId::new(2), 22))
    );
    // Main epoch 5 only twice so far: 5 and 15.
    assert_eq!(
        sim.continuum_covering_main_epoch(ship, 5).unwrap(),
        Some((ContinuumId::new(1), 15))
    );
    let timeline = sim.object(ship).unwrap().timeline();
    assert_eq!(
        timeline
            .self_epoch_for_main_epoch(ContinuumId::new(0), 5)
            .unwrap(),
        5
    );
}

// ---------------------------------------------------------------------------
// Border reflection
// ---------------------------------------------------------------------------

#[test]
fn object_bounces_off_right_border() {
    let mut sim = Simulation::new(SimulationConfig::default());
    let ship = sim.spawn(
        SpaceTimePosition::new(0, Vec2::new(748.0, 0.0), 0.0),
        SpaceSpeed::new(Vec2::new(5.0, 0.0), 0.0),
    );
    sim.tick().unwrap();
    let object = sim.object(ship).unwrap();
    assert_eq!(object.latest_space_time_position().unwrap().position.x, 748.0);
    assert_eq!(object.latest_space_speed().unwrap().velocity.x, -5.0);

    sim.tick().unwrap();
    assert_eq!(
        sim.latest_space_time_position(ship).unwrap().position.x,
        743.0
    );
}

#[test]
fn hitbox_is_cached_per_self_epoch() {
    let mut sim = Simulation::new(config(50));
    let (stp, speed) = drifting(2.0);
    let ship = sim.spawn(stp, speed);
    sim.run_ticks(3).unwrap();
    for self_epoch in 0..=3u64 {
        let hitbox = sim.hitbox_at(ship, self_epoch).unwrap();
        assert_eq!(hitbox[0], Vec2::new(2.0 * self_epoch as f64, 0.0));
        assert_eq!(hitbox[2], Vec2::new(2.0 * self_epoch as f64 + 1.0, 1.0));
    }
    assert!(matches!(
        sim.hitbox_at(ship, 4),
        Err(SimError::Timeline(TimelineError::IndexOutOfRange { .. }))
    ));
}

// ---------------------------------------------------------------------------
// Destruction cascade
// ---------------------------------------------------------------------------

fn parent_with_child_at_ten() -> (Simulation, EntityId, EntityId) {
    let mut sim = Simulation::new(config(100));
    let (stp, speed) = drifting(1.0);
    let parent = sim.spawn(stp, speed);
    sim.run_ticks(10).unwrap();
    let child = sim.spawn_child(parent, stp, speed).unwrap();
    sim.run_ticks(10).unwrap();
    (sim, parent, child)
}

#[test]
fn destroying_parent_before_creation_removes_child() {
    let (mut sim, parent, child) = parent_with_child_at_ten();
    sim.destroy(parent, 5).unwrap();

    let child_object = sim.object(child).unwrap();
    assert!(child_object.hitbox_at(0).is_err());
    assert!(child_object.continuum_covering_main_epoch(12).is_none());

    let parent_object = sim.object(parent).unwrap();
    assert!(parent_object.hitbox_at(5).is_ok());
    assert!(matches!(
        parent_object.hitbox_at(6),
        Err(TimelineError::Destroyed { self_epoch: 6 })
    ));

    let report = sim.tick().unwrap();
    assert!(report.advanced.is_empty());
    assert_eq!(report.skipped, vec![parent, child]);
}

#[test]
fn destroying_parent_after_creation_keeps_child() {
    let (mut sim, parent, child) = parent_with_child_at_ten();
    sim.destroy(parent, 15).unwrap();
    assert_eq!(sim.propagation_self_epoch(parent).unwrap(), 15);
    assert!(!sim.object(child).unwrap().is_destroyed());
    assert_eq!(sim.propagation_self_epoch(child).unwrap(), 10);
    let report = sim.tick().unwrap();
    assert_eq!(report.advanced, vec![child]);
}

// ---------------------------------------------------------------------------
// Patching through the object
// ---------------------------------------------------------------------------

#[test]
fn empty_patch_leaves_state_hash_unchanged() {
    let mut sim = Simulation::new(config(8));
    let (stp, speed) = drifting(1.0);
    let ship = sim.spawn(stp, speed);
    sim.run_ticks(20).unwrap();
    let before = sim.state_hash().unwrap();

    let object = sim.object_mut(ship).unwrap();
    for self_epoch in 0..object.timeline().len() {
        object.patch(self_epoch, &RecordPatch::new()).unwrap();
    }
    assert_eq!(sim.state_hash().unwrap(), before);
}

#[test]
fn controlled_ship_turns_and_slows() {
    let mut sim = Simulation::new(config(500));
    let (stp, speed) = drifting(0.0);
    let ship = sim.spawn(stp, speed);
    sim.attach_pilot(ship, Box::new(PlayerController::default()))
        .unwrap();

    sim.set_input(ship, PilotInput::new(Axis::Positive, Axis::Positive))
        .unwrap();
    sim.run_ticks(20).unwrap();
    let turning = sim.object(ship).unwrap().latest_space_speed().unwrap();
    assert!(turning.angular_velocity > 0.0);
    assert!(turning.velocity.length() > 0.0);

    sim.set_input(ship, PilotInput::default()).unwrap();
    sim.run_ticks(200).unwrap();
    let coasting = sim.object(ship).unwrap().latest_space_speed().unwrap();
    assert_eq!(coasting.angular_velocity, 0.0);
    assert!(coasting.velocity.length() < turning.velocity.length());
}
