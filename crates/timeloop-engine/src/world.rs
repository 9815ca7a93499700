//! The simulation: every temporal object on one shared world clock.
//!
//! [`Simulation`] owns the configuration, the objects, their pilots and the
//! [`LifecycleGraph`]. Each [`tick`](Simulation::tick):
//!
//! 1. Every piloted, advanceable object's pilot queues thrust.
//! 2. Every advanceable object ticks, in [`EntityId`] order.
//! 3. The world clock advances.
//!
//! All objects finish step 2 before anything reads the new hitboxes, so
//! collision queries never see a half-advanced world.
//!
//! # Example
//!
//! ```
//! use timeloop_engine::prelude::*;
//!
//! let config = SimulationConfig { total_ticks: 100, ..Default::default() };
//! let mut sim = Simulation::new(config);
//! let ship = sim.spawn(
//!     SpaceTimePosition::new(0, Vec2::ZERO, 0.0),
//!     SpaceSpeed::new(Vec2::new(1.0, 0.0), 0.0),
//! );
//!
//! sim.run_ticks(100).unwrap();
//! assert_eq!(sim.main_epoch(), 0);
//! assert_eq!(sim.propagation_self_epoch(ship).unwrap(), 100);
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use timeloop_core::continuum::ContinuumId;
use timeloop_core::entity::{EntityAllocator, EntityId};
use timeloop_core::lifecycle::LifecycleGraph;
use timeloop_core::spacetime::{MainEpoch, SelfEpoch, SpaceSpeed, SpaceTimePosition, Vec2};
use timeloop_core::TimelineError;

use crate::config::SimulationConfig;
use crate::controller::{Pilot, PilotInput};
use crate::object::{default_hitbox_shape, Kinematic, TemporalObject};
use crate::{SimError, SimResult};

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// What one [`Simulation::tick`] did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Elapsed ticks after this one.
    pub tick: u64,
    /// Main epoch of the world clock after this tick.
    pub main_epoch: MainEpoch,
    /// Objects that committed a new self-epoch.
    pub advanced: Vec<EntityId>,
    /// Objects that could not advance (destroyed or unseeded).
    pub skipped: Vec<EntityId>,
    /// Continuums opened this tick.
    pub opened: Vec<(EntityId, ContinuumId)>,
    /// The loop limit was reached; nothing moved.
    pub halted: bool,
    /// Wall-clock time for the whole tick.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct Simulation {
    config: SimulationConfig,
    allocator: EntityAllocator,
    objects: BTreeMap<EntityId, TemporalObject>,
    #[serde(skip)]
    pilots: BTreeMap<EntityId, Box<dyn Pilot>>,
    inputs: BTreeMap<EntityId, PilotInput>,
    lifecycle: LifecycleGraph,
    elapsed: u64,
}

impl Simulation {
    /// Create an empty simulation.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`SimulationConfig::validate`].
    pub fn new(config: SimulationConfig) -> Self {
        if let Err(error) = config.validate() {
            panic!("invalid simulation config: {error}");
        }
        Self {
            config,
            allocator: EntityAllocator::new(),
            objects: BTreeMap::new(),
            pilots: BTreeMap::new(),
            inputs: BTreeMap::new(),
            lifecycle: LifecycleGraph::new(),
            elapsed: 0,
        }
    }

    /// Like [`new`](Self::new), returning the validation error instead.
    pub fn try_new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    // -- lifecycle ----------------------------------------------------------

    /// Add a seeded object with the default hitbox.
    pub fn spawn(&mut self, stp: SpaceTimePosition, speed: SpaceSpeed) -> EntityId {
        self.insert(TemporalObject::new(stp, speed, default_hitbox_shape()))
    }

    /// Add an already-built object. The configured trail cadence replaces
    /// whatever the object had.
    pub fn insert(&mut self, object: TemporalObject) -> EntityId {
        let id = self.allocator.allocate();
        let object = object
            .with_trail_cadence(self.config.trail_marker_start, self.config.trail_marker_every);
        self.objects.insert(id, object);
        tracing::debug!(entity = %id, "object spawned");
        id
    }

    /// Add an object created by `parent` at the parent's current
    /// propagation self-epoch.
    ///
    /// A parent that can no longer advance creates nothing.
    pub fn spawn_child(
        &mut self,
        parent: EntityId,
        stp: SpaceTimePosition,
        speed: SpaceSpeed,
    ) -> SimResult<EntityId> {
        let parent_object = self.object(parent)?;
        if parent_object.timeline().is_empty() {
            return Err(TimelineError::Uninitialized.into());
        }
        let created_at = parent_object.live_self_epoch()?;
        if !parent_object.can_tick() {
            return Err(TimelineError::Destroyed {
                self_epoch: created_at,
            }
            .into());
        }
        let child = self.allocator.allocate();
        self.lifecycle.create(parent, child, created_at)?;
        let object = TemporalObject::new(stp, speed, default_hitbox_shape())
            .with_trail_cadence(self.config.trail_marker_start, self.config.trail_marker_every);
        self.objects.insert(child, object);
        tracing::debug!(entity = %child, %parent, created_at, "child spawned");
        Ok(child)
    }

    /// Destroy `entity` after its self-epoch `at`, cascading to the objects
    /// it created.
    pub fn destroy(&mut self, entity: EntityId, at: SelfEpoch) -> SimResult<()> {
        self.object(entity)?;
        for order in self.lifecycle.destroy(entity, at) {
            let object = self
                .objects
                .get_mut(&order.entity)
                .ok_or(SimError::UnknownEntity(order.entity))?;
            object.destroy(order.scope)?;
        }
        Ok(())
    }

    /// Steer `entity` with `pilot` from the next tick on.
    pub fn attach_pilot(&mut self, entity: EntityId, pilot: Box<dyn Pilot>) -> SimResult<()> {
        self.object(entity)?;
        self.pilots.insert(entity, pilot);
        Ok(())
    }

    /// Remove `entity`'s pilot, if it has one.
    pub fn detach_pilot(&mut self, entity: EntityId) -> Option<Box<dyn Pilot>> {
        self.pilots.remove(&entity)
    }

    /// The input `entity`'s pilot sees on every tick until changed.
    pub fn set_input(&mut self, entity: EntityId, input: PilotInput) -> SimResult<()> {
        self.object(entity)?;
        self.inputs.insert(entity, input);
        Ok(())
    }

    // -- stepping -----------------------------------------------------------

    /// Advance every object by one tick.
    ///
    /// A pilot that fails is logged and its object still ticks with whatever
    /// thrust was queued. Objects that cannot advance are reported as skipped.
    pub fn tick(&mut self) -> SimResult<TickReport> {
        let start = Instant::now();
        let mut report = TickReport {
            tick: self.elapsed,
            main_epoch: self.main_epoch(),
            ..Default::default()
        };
        if self.is_halted() {
            report.halted = true;
            report.duration = start.elapsed();
            return Ok(report);
        }

        // Phase 1: pilots queue thrust against the last committed state.
        for (&id, pilot) in self.pilots.iter_mut() {
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            if !object.can_tick() {
                continue;
            }
            let input = self.inputs.get(&id).copied().unwrap_or_default();
            if let Err(error) = pilot.pilot(object, input) {
                tracing::warn!(entity = %id, %error, "pilot failed");
            }
        }

        // Phase 2: every object commits its next self-epoch.
        for (&id, object) in self.objects.iter_mut() {
            if !object.can_tick() {
                report.skipped.push(id);
                continue;
            }
            let tick = object.tick(&self.config)?;
            if let Some(opened) = tick.opened() {
                report.opened.push((id, opened));
            }
            report.advanced.push(id);
        }

        // Phase 3: world clock.
        self.elapsed += 1;
        report.tick = self.elapsed;
        report.main_epoch = self.main_epoch();
        report.duration = start.elapsed();
        Ok(report)
    }

    /// Run `count` ticks, stopping early once halted. Returns the number of
    /// ticks that actually ran.
    pub fn run_ticks(&mut self, count: u64) -> SimResult<u64> {
        let mut ran = 0;
        for _ in 0..count {
            if self.tick()?.halted {
                break;
            }
            ran += 1;
        }
        Ok(ran)
    }

    // -- world clock --------------------------------------------------------

    /// Ticks run so far.
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Current position of the world clock on the main timeline.
    pub fn main_epoch(&self) -> MainEpoch {
        self.elapsed % self.config.total_ticks
    }

    /// Completed loops of the main timeline.
    pub fn loops_completed(&self) -> u64 {
        self.elapsed / self.config.total_ticks
    }

    /// Whether the configured loop limit has been reached.
    pub fn is_halted(&self) -> bool {
        self.config
            .tick_limit()
            .is_some_and(|limit| self.elapsed >= limit)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Depth of main epoch `main_epoch` for renderers.
    pub fn z_from_epoch(&self, main_epoch: MainEpoch) -> f64 {
        self.config.z_from_epoch(main_epoch)
    }

    // -- objects ------------------------------------------------------------

    pub fn object(&self, entity: EntityId) -> SimResult<&TemporalObject> {
        self.objects
            .get(&entity)
            .ok_or(SimError::UnknownEntity(entity))
    }

    /// Mutable access for setup and scripted edits (patches, manual thrust).
    pub fn object_mut(&mut self, entity: EntityId) -> SimResult<&mut TemporalObject> {
        self.objects
            .get_mut(&entity)
            .ok_or(SimError::UnknownEntity(entity))
    }

    /// Every object in id order.
    pub fn objects(&self) -> impl Iterator<Item = (EntityId, &TemporalObject)> {
        self.objects.iter().map(|(&id, object)| (id, object))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn lifecycle(&self) -> &LifecycleGraph {
        &self.lifecycle
    }

    // -- view queries -------------------------------------------------------

    pub fn latest_space_time_position(&self, entity: EntityId) -> SimResult<SpaceTimePosition> {
        Ok(self.object(entity)?.latest_space_time_position()?)
    }

    pub fn hitbox_at(&self, entity: EntityId, self_epoch: SelfEpoch) -> SimResult<&[Vec2]> {
        Ok(self.object(entity)?.hitbox_at(self_epoch)?)
    }

    pub fn continuum_covering_main_epoch(
        &self,
        entity: EntityId,
        main_epoch: MainEpoch,
    ) -> SimResult<Option<(ContinuumId, SelfEpoch)>> {
        Ok(self.object(entity)?.continuum_covering_main_epoch(main_epoch))
    }

    /// The live self-epoch, or `Destroyed` for a fully erased object.
    pub fn propagation_self_epoch(&self, entity: EntityId) -> SimResult<SelfEpoch> {
        Ok(self.object(entity)?.live_self_epoch()?)
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("objects", &self.objects.len())
            .field("pilots", &self.pilots.len())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
