//! Temporal objects: a timeline plus the physical body that writes it.
//!
//! A [`TemporalObject`] owns one [`Timeline`], a local hitbox polygon, the
//! thrust queued for its next tick and a cache of world-space hitboxes, one
//! per self-epoch. [`TemporalObject::tick`] is the only state transition: it
//! integrates, appends and clears the queued thrust, or fails before touching
//! anything.

use serde::{Deserialize, Serialize};
use timeloop_core::continuum::{ContinuumEvent, ContinuumId};
use timeloop_core::ledger::{LedgerRecord, RecordPatch};
use timeloop_core::spacetime::{MainEpoch, SelfEpoch, SpaceSpeed, SpaceTimePosition, Vec2};
use timeloop_core::timeline::{DestructionScope, Timeline};
use timeloop_core::{TimelineError, TimelineResult};

use crate::config::SimulationConfig;
use crate::physics::{integrate, orient_hitbox, Reflection, Thrust};
use crate::render::{self, ContinuumMarkers, RenderStyle, Renderable, TrailMarkers, TrailSegment};

/// Hitbox of the original ship: a unit right triangle.
pub fn default_hitbox_shape() -> Vec<Vec2> {
    vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)]
}

// ---------------------------------------------------------------------------
// Kinematic
// ---------------------------------------------------------------------------

/// The physical face of an object: read the last committed state and queue
/// thrust for the next tick.
pub trait Kinematic {
    /// Add to the translation thrust applied at the next tick.
    fn accelerate_translation(&mut self, delta: Vec2);

    /// Add to the angular thrust applied at the next tick.
    fn accelerate_rotation(&mut self, delta: f64);

    fn latest_space_time_position(&self) -> TimelineResult<SpaceTimePosition>;

    fn latest_space_speed(&self) -> TimelineResult<SpaceSpeed>;

    /// The self-epoch currently live.
    fn propagation_self_epoch(&self) -> SelfEpoch;
}

// ---------------------------------------------------------------------------
// ObjectTick
// ---------------------------------------------------------------------------

/// What one successful [`TemporalObject::tick`] committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTick {
    pub self_epoch: SelfEpoch,
    pub main_epoch: MainEpoch,
    pub event: ContinuumEvent,
    pub reflection: Reflection,
}

impl ObjectTick {
    /// The continuum this tick opened, if it was a discontinuity.
    pub fn opened(&self) -> Option<ContinuumId> {
        match self.event {
            ContinuumEvent::Opened { opened, .. } => Some(opened),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TemporalObject
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalObject {
    timeline: Timeline,
    shape: Vec<Vec2>,
    /// World-space hitbox per self-epoch, same length as the ledger.
    hitboxes: Vec<Vec<Vec2>>,
    thrust: Thrust,
    propagation_self_epoch: SelfEpoch,
    markers: TrailMarkers,
    style: RenderStyle,
}

impl TemporalObject {
    /// An object with no seed record. It must be [`seed`](Self::seed)ed
    /// before it can tick.
    pub fn unseeded(shape: Vec<Vec2>) -> Self {
        let defaults = SimulationConfig::default();
        Self {
            timeline: Timeline::new(),
            shape,
            hitboxes: Vec::new(),
            thrust: Thrust::default(),
            propagation_self_epoch: 0,
            markers: TrailMarkers::new(defaults.trail_marker_start, defaults.trail_marker_every),
            style: RenderStyle::default(),
        }
    }

    /// An object born at `stp` moving with `speed`.
    pub fn new(stp: SpaceTimePosition, speed: SpaceSpeed, shape: Vec<Vec2>) -> Self {
        let mut object = Self::unseeded(shape);
        object.install_seed(LedgerRecord::new(stp, speed));
        object
    }

    /// Use `style` when rendering.
    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Replace the trail-marker cadence, rebuilding existing markers.
    pub fn with_trail_cadence(mut self, start: SelfEpoch, every: u64) -> Self {
        self.markers = TrailMarkers::new(start, every);
        for (self_epoch, record) in (0u64..).zip(self.timeline.ledger().records()) {
            if self.timeline.is_visible(self_epoch) {
                self.markers.observe(self_epoch, record.space_time_position);
            }
        }
        self
    }

    /// Write the record at self-epoch 0.
    ///
    /// On an unseeded object this is the birth record; otherwise it rewrites
    /// the existing seed.
    pub fn seed(&mut self, stp: SpaceTimePosition, speed: SpaceSpeed) -> TimelineResult<()> {
        let record = LedgerRecord::new(stp, speed);
        if self.timeline.is_empty() {
            self.install_seed(record);
            return Ok(());
        }
        self.patch(0, &RecordPatch::from_record(&record)).map(drop)
    }

    fn install_seed(&mut self, record: LedgerRecord) {
        let stp = record.space_time_position;
        self.timeline = Timeline::seeded(record);
        self.hitboxes = vec![orient_hitbox(&self.shape, &stp)];
        self.propagation_self_epoch = 0;
        self.markers.observe(0, stp);
    }

    // -- state transition ---------------------------------------------------

    /// Integrate the queued thrust and commit the next self-epoch.
    ///
    /// Fails with `Uninitialized` on an unseeded object and `Destroyed` past
    /// a destruction point; in both cases nothing changes, including the
    /// queued thrust.
    pub fn tick(&mut self, config: &SimulationConfig) -> TimelineResult<ObjectTick> {
        let latest = match self.timeline.latest() {
            Ok((_, record)) => record,
            Err(TimelineError::Empty) => return Err(TimelineError::Uninitialized),
            Err(error) => return Err(error),
        };
        if !self.timeline.can_advance() {
            return Err(TimelineError::Destroyed {
                self_epoch: self.timeline.len(),
            });
        }

        let step = integrate(
            latest,
            self.thrust,
            config.total_ticks,
            config.field_half_extents(),
        );
        let stp = step.record.space_time_position;
        let hitbox = orient_hitbox(&self.shape, &stp);

        let written = self.timeline.append(step.record)?;
        self.hitboxes.push(hitbox);
        self.thrust = Thrust::default();
        self.propagation_self_epoch = written.self_epoch;
        self.markers.observe(written.self_epoch, stp);

        tracing::trace!(
            self_epoch = written.self_epoch,
            main_epoch = stp.main_epoch,
            continuum = %written.event.continuum(),
            "tick committed"
        );

        Ok(ObjectTick {
            self_epoch: written.self_epoch,
            main_epoch: stp.main_epoch,
            event: written.event,
            reflection: step.reflection,
        })
    }

    /// Patch an existing record, keeping the hitbox cache and trail markers
    /// in step with it.
    pub fn patch(
        &mut self,
        self_epoch: SelfEpoch,
        patch: &RecordPatch,
    ) -> TimelineResult<ContinuumEvent> {
        let event = self.timeline.patch(self_epoch, patch)?;
        let stp = self.timeline.record_at(self_epoch)?.space_time_position;
        if patch.moves_body() {
            if let Some(slot) = usize::try_from(self_epoch)
                .ok()
                .and_then(|i| self.hitboxes.get_mut(i))
            {
                *slot = orient_hitbox(&self.shape, &stp);
            }
        }
        self.markers.observe(self_epoch, stp);
        Ok(event)
    }

    /// Hide part or all of this object's life.
    ///
    /// A truncation pulls the propagation cursor back to the last visible
    /// self-epoch.
    pub fn destroy(&mut self, scope: DestructionScope) -> TimelineResult<()> {
        self.timeline.destroy(scope)?;
        if let Some(effective) = self.timeline.destruction() {
            self.markers.apply_destruction(effective);
            if let DestructionScope::Truncate { at } = effective {
                self.propagation_self_epoch = self.propagation_self_epoch.min(at);
            }
        }
        Ok(())
    }

    // -- queries ------------------------------------------------------------

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn shape(&self) -> &[Vec2] {
        &self.shape
    }

    /// Thrust queued for the next tick.
    pub fn pending_thrust(&self) -> Thrust {
        self.thrust
    }

    pub fn is_destroyed(&self) -> bool {
        self.timeline.is_destroyed()
    }

    /// Whether [`tick`](Self::tick) would succeed.
    pub fn can_tick(&self) -> bool {
        self.timeline.can_advance()
    }

    /// The propagation self-epoch, or `Destroyed` once it is no longer
    /// visible.
    pub fn live_self_epoch(&self) -> TimelineResult<SelfEpoch> {
        let self_epoch = self.propagation_self_epoch;
        if self.timeline.is_visible(self_epoch) {
            Ok(self_epoch)
        } else {
            Err(TimelineError::Destroyed { self_epoch })
        }
    }

    /// World-space hitbox at `self_epoch`.
    pub fn hitbox_at(&self, self_epoch: SelfEpoch) -> TimelineResult<&[Vec2]> {
        self.timeline.record_at(self_epoch)?;
        usize::try_from(self_epoch)
            .ok()
            .and_then(|i| self.hitboxes.get(i))
            .map(Vec::as_slice)
            .ok_or(TimelineError::IndexOutOfRange {
                self_epoch,
                len: self.timeline.len(),
            })
    }

    /// The object's most recent visible pass through `main_epoch`.
    pub fn continuum_covering_main_epoch(
        &self,
        main_epoch: MainEpoch,
    ) -> Option<(ContinuumId, SelfEpoch)> {
        self.timeline.continuum_covering_main_epoch(main_epoch)
    }

    fn latest_record(&self) -> TimelineResult<&LedgerRecord> {
        match self.timeline.latest() {
            Ok((_, record)) => Ok(record),
            Err(TimelineError::Empty) => Err(TimelineError::Uninitialized),
            Err(error) => Err(error),
        }
    }
}

impl Kinematic for TemporalObject {
    fn accelerate_translation(&mut self, delta: Vec2) {
        self.thrust.push_translation(delta);
    }

    fn accelerate_rotation(&mut self, delta: f64) {
        self.thrust.push_rotation(delta);
    }

    fn latest_space_time_position(&self) -> TimelineResult<SpaceTimePosition> {
        self.latest_record().map(|record| record.space_time_position)
    }

    fn latest_space_speed(&self) -> TimelineResult<SpaceSpeed> {
        self.latest_record().map(|record| record.space_speed)
    }

    fn propagation_self_epoch(&self) -> SelfEpoch {
        self.propagation_self_epoch
    }
}

impl Renderable for TemporalObject {
    fn render_style(&self) -> &RenderStyle {
        &self.style
    }

    fn trail_markers(&self) -> &TrailMarkers {
        &self.markers
    }

    fn trail_segments(&self) -> Vec<TrailSegment> {
        render::trail_segments(&self.timeline)
    }

    fn continuum_markers(&self) -> Vec<ContinuumMarkers> {
        render::continuum_markers(&self.timeline)
    }

    fn propagation_marker(&self, main_epoch: MainEpoch) -> Option<SpaceTimePosition> {
        let (_, self_epoch) = self.continuum_covering_main_epoch(main_epoch)?;
        self.timeline
            .record_at(self_epoch)
            .ok()
            .map(|record| record.space_time_position)
    }

    fn propagation_markers(&self, main_epoch: MainEpoch) -> Vec<(ContinuumId, SpaceTimePosition)> {
        render::propagation_markers(&self.timeline, main_epoch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
