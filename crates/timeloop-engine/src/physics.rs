//! Per-tick kinematics for temporal objects.
//!
//! The integrator is a pure function from the latest committed record and the
//! thrust accumulated since, to the record of the next self-epoch. It never
//! touches a timeline itself; [`TemporalObject::tick`](crate::object::TemporalObject::tick)
//! commits the result.
//!
//! One step:
//!
//! 1. `velocity += thrust.translation`, `angular_velocity += thrust.rotation`
//! 2. `position += velocity`, `rotation += angular_velocity`
//! 3. `main_epoch = (main_epoch + 1) % total_ticks`
//! 4. per axis, if `|position| >= half extent`: negate that velocity
//!    component and add it once more to the position
//!
//! Arithmetic is plain `f64`: no clamping and no normalization of rotation.

use serde::{Deserialize, Serialize};
use timeloop_core::ledger::LedgerRecord;
use timeloop_core::spacetime::{orient_polygon, MainEpoch, SpaceSpeed, SpaceTimePosition, Vec2};

// ---------------------------------------------------------------------------
// Thrust
// ---------------------------------------------------------------------------

/// Velocity deltas waiting for the next tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thrust {
    pub translation: Vec2,
    pub rotation: f64,
}

impl Thrust {
    /// Add a translation delta.
    #[inline]
    pub fn push_translation(&mut self, delta: Vec2) {
        self.translation += delta;
    }

    /// Add an angular delta.
    #[inline]
    pub fn push_rotation(&mut self, delta: f64) {
        self.rotation += delta;
    }

    /// Return the accumulated thrust and reset to zero.
    #[inline]
    pub fn take(&mut self) -> Thrust {
        std::mem::take(self)
    }
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

/// Which axes bounced during a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reflection {
    pub x: bool,
    pub y: bool,
}

impl Reflection {
    pub fn any(self) -> bool {
        self.x || self.y
    }
}

/// Output of [`integrate`]: the next record and what happened on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratedStep {
    pub record: LedgerRecord,
    pub reflection: Reflection,
}

/// Advance `latest` by one tick under `thrust`.
///
/// Hit points are carried forward; the continuum is left for the tracker.
pub fn integrate(
    latest: &LedgerRecord,
    thrust: Thrust,
    total_ticks: u64,
    half_extents: Vec2,
) -> IntegratedStep {
    let stp = latest.space_time_position;
    let speed = latest.space_speed;

    let mut velocity = speed.velocity + thrust.translation;
    let angular_velocity = speed.angular_velocity + thrust.rotation;

    let mut position = stp.position + velocity;
    let rotation = stp.rotation + angular_velocity;
    let main_epoch = next_main_epoch(stp.main_epoch, total_ticks);

    let reflection = reflect_at_border(&mut position, &mut velocity, half_extents);
    if reflection.any() {
        tracing::trace!(
            main_epoch,
            x = position.x,
            y = position.y,
            reflected_x = reflection.x,
            reflected_y = reflection.y,
            "border reflection"
        );
    }

    let record = LedgerRecord::new(
        SpaceTimePosition::new(main_epoch, position, rotation),
        SpaceSpeed::new(velocity, angular_velocity),
    )
    .with_hit_points(latest.hit_points);

    IntegratedStep { record, reflection }
}

/// The main epoch after `main_epoch` on a loop of `total_ticks`.
#[inline]
pub fn next_main_epoch(main_epoch: MainEpoch, total_ticks: u64) -> MainEpoch {
    (main_epoch + 1) % total_ticks
}

/// Bounce `position`/`velocity` off the field border, each axis on its own.
///
/// A reflecting axis gets one tick of travel at the negated velocity rather
/// than being clamped to the border.
pub fn reflect_at_border(position: &mut Vec2, velocity: &mut Vec2, half_extents: Vec2) -> Reflection {
    let mut reflection = Reflection::default();
    if position.x.abs() >= half_extents.x {
        velocity.x = -velocity.x;
        position.x += velocity.x;
        reflection.x = true;
    }
    if position.y.abs() >= half_extents.y {
        velocity.y = -velocity.y;
        position.y += velocity.y;
        reflection.y = true;
    }
    reflection
}

/// World-space hitbox of `shape` placed at `stp`.
#[inline]
pub fn orient_hitbox(shape: &[Vec2], stp: &SpaceTimePosition) -> Vec<Vec2> {
    orient_polygon(shape, stp.position, stp.rotation)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
