//! Timeloop Engine -- tick-driven simulation of temporal objects.
//!
//! This crate builds on [`timeloop_core`] to move objects: a per-tick
//! kinematic integrator with border reflection, pilots that turn input into
//! thrust, and a [`Simulation`](world::Simulation) that advances every object
//! on a shared, looping world clock.
//!
//! # Quick Start
//!
//! ```
//! use timeloop_engine::prelude::*;
//!
//! let config = SimulationConfig { total_ticks: 100, ..Default::default() };
//! let mut sim = Simulation::new(config);
//!
//! let ship = sim.spawn(
//!     SpaceTimePosition::new(0, Vec2::ZERO, 0.0),
//!     SpaceSpeed::new(Vec2::new(1.0, 0.0), 0.0),
//! );
//! sim.attach_pilot(ship, Box::new(PlayerController::default())).unwrap();
//! sim.set_input(ship, PilotInput::new(Axis::Positive, Axis::Neutral)).unwrap();
//!
//! let report = sim.tick().unwrap();
//! assert_eq!(report.advanced, vec![ship]);
//! assert_eq!(sim.latest_space_time_position(ship).unwrap().main_epoch, 1);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod object;
pub mod physics;
pub mod render;
pub mod snapshot;
pub mod world;

use timeloop_core::entity::EntityId;
use timeloop_core::TimelineError;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use timeloop_core;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A timeline operation on one object failed.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// No object with this id exists in the simulation.
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    /// The configuration violates a constraint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration document is not valid JSON for [`config::SimulationConfig`].
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Simulation state could not be serialized for hashing.
    #[error("failed to serialize simulation state: {0}")]
    Snapshot(serde_json::Error),
}

/// Shorthand result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use timeloop_core::prelude::*;

    pub use crate::config::SimulationConfig;
    pub use crate::controller::{
        Axis, ControllerConfig, Pilot, PilotInput, PlayerController, WanderController,
    };
    pub use crate::object::{default_hitbox_shape, Kinematic, ObjectTick, TemporalObject};
    pub use crate::physics::{integrate, orient_hitbox, IntegratedStep, Reflection, Thrust};
    pub use crate::render::{
        ContinuumMarkers, RenderStyle, Renderable, Swatch, TrailMarkers, TrailSegment,
    };
    pub use crate::world::{Simulation, TickReport};
    pub use crate::{SimError, SimResult};
}
