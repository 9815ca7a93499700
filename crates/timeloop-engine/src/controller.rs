//! Pilots: whatever turns intent into thrust before each tick.
//!
//! A [`Pilot`] sees an object only through [`Kinematic`], so it can read the
//! latest committed state and queue thrust but never commit a tick itself.
//! The simulation calls every pilot before advancing any object.

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use timeloop_core::spacetime::Vec2;
use timeloop_core::TimelineResult;

use crate::object::Kinematic;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A three-way input axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl Axis {
    /// `-1.0`, `0.0` or `1.0`.
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            Axis::Negative => -1.0,
            Axis::Neutral => 0.0,
            Axis::Positive => 1.0,
        }
    }

    /// Combine two held keys; both or neither held is neutral.
    pub fn from_keys(negative: bool, positive: bool) -> Self {
        match (negative, positive) {
            (true, false) => Axis::Negative,
            (false, true) => Axis::Positive,
            _ => Axis::Neutral,
        }
    }
}

/// One tick's worth of steering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotInput {
    /// Forward/backward engine.
    pub forward: Axis,
    /// Positive turns counter-clockwise.
    pub turn: Axis,
}

impl PilotInput {
    pub fn new(forward: Axis, turn: Axis) -> Self {
        Self { forward, turn }
    }
}

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

/// Queues thrust on a body once per tick.
pub trait Pilot {
    /// Decide this tick's thrust. `input` is the external input for the
    /// body, neutral when nobody provided one.
    fn pilot(&mut self, body: &mut dyn Kinematic, input: PilotInput) -> TimelineResult<()>;
}

// ---------------------------------------------------------------------------
// PlayerController
// ---------------------------------------------------------------------------

/// Tuning for [`PlayerController`]. Defaults are the original ship's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub translation_thrust: f64,
    pub rotation_thrust: f64,
    pub translation_friction: f64,
    pub rotation_friction: f64,
    /// Below this angular speed, an idle turn axis stops rotation outright.
    pub minimal_rotation_speed: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            translation_thrust: 0.1,
            rotation_thrust: 0.01,
            translation_friction: 0.02,
            rotation_friction: 0.1,
            minimal_rotation_speed: 0.003,
        }
    }
}

/// Ship-style steering from a forward/turn input pair, with drag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerController {
    config: ControllerConfig,
}

impl PlayerController {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

impl Pilot for PlayerController {
    fn pilot(&mut self, body: &mut dyn Kinematic, input: PilotInput) -> TimelineResult<()> {
        let cfg = &self.config;
        let rotation = body.latest_space_time_position()?.rotation;
        let speed = body.latest_space_speed()?;

        // Engine along the current heading.
        let heading = Vec2::from_angle(rotation);
        body.accelerate_translation(heading * (cfg.translation_thrust * input.forward.value()));
        body.accelerate_rotation(cfg.rotation_thrust * input.turn.value());

        body.accelerate_translation(-speed.velocity * cfg.translation_friction);

        let spin = speed.angular_velocity;
        if spin.abs() < cfg.minimal_rotation_speed && input.turn == Axis::Neutral {
            body.accelerate_rotation(-spin);
        } else {
            body.accelerate_rotation(-spin * cfg.rotation_friction);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WanderController
// ---------------------------------------------------------------------------

/// A scripted pilot that cruises forward and picks a random turn direction,
/// held for a random number of ticks. Same seed, same path.
#[derive(Debug, Clone)]
pub struct WanderController {
    steering: PlayerController,
    rng: Pcg64,
    turn: Axis,
    hold_remaining: u32,
    max_hold: u32,
}

impl WanderController {
    /// `max_hold` bounds how long one turn decision lasts (at least 1 tick).
    pub fn new(seed: u64, max_hold: u32, config: ControllerConfig) -> Self {
        Self {
            steering: PlayerController::new(config),
            rng: Pcg64::seed_from_u64(seed),
            turn: Axis::Neutral,
            hold_remaining: 0,
            max_hold: max_hold.max(1),
        }
    }

    /// The turn currently held.
    pub fn turn(&self) -> Axis {
        self.turn
    }

    fn next_turn(&mut self) -> Axis {
        if self.hold_remaining == 0 {
            self.turn = match self.rng.gen_range(0..3u8) {
                0 => Axis::Negative,
                1 => Axis::Neutral,
                _ => Axis::Positive,
            };
            self.hold_remaining = self.rng.gen_range(1..=self.max_hold);
        }
        self.hold_remaining -= 1;
        self.turn
    }
}

impl Pilot for WanderController {
    fn pilot(&mut self, body: &mut dyn Kinematic, _input: PilotInput) -> TimelineResult<()> {
        let turn = self.next_turn();
        self.steering
            .pilot(body, PilotInput::new(Axis::Positive, turn))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
