//! The view-facing side of a temporal object.
//!
//! Nothing here draws. A renderer reads positions, markers and segments
//! through [`Renderable`] and decides how to present them; [`RenderStyle`]
//! carries the colours it should use, chosen by whoever builds the object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use timeloop_core::continuum::{is_discontinuity, ContinuumId};
use timeloop_core::spacetime::{MainEpoch, SelfEpoch, SpaceTimePosition};
use timeloop_core::timeline::{DestructionScope, Timeline};

// ---------------------------------------------------------------------------
// RenderStyle
// ---------------------------------------------------------------------------

/// A colour (`0xRRGGBB`) and its opacity in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swatch {
    pub color: u32,
    pub opacity: f32,
}

impl Swatch {
    pub const fn new(color: u32, opacity: f32) -> Self {
        Self { color, opacity }
    }
}

/// Colours for every visual element of one object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderStyle {
    /// The object at its propagation self-epoch.
    pub active: Swatch,
    /// Trail markers.
    pub past: Swatch,
    /// Marker at a continuum's opening record.
    pub continuum_first: Swatch,
    /// Marker at a continuum's closing record.
    pub continuum_last: Swatch,
    /// Where the world clock cursor currently meets the object.
    pub propagation_marker: Swatch,
    /// Trail segments.
    pub trail_line: Swatch,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            active: Swatch::new(0xffffff, 1.0),
            past: Swatch::new(0xffffff, 1.0),
            continuum_first: Swatch::new(0x00ffff, 1.0),
            continuum_last: Swatch::new(0x00ffff, 1.0),
            propagation_marker: Swatch::new(0xa09090, 1.0),
            trail_line: Swatch::new(0x0000ff, 1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// TrailMarkers
// ---------------------------------------------------------------------------

/// Sparse snapshots of an object's past, one every `every` self-epochs
/// starting at `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailMarkers {
    start: SelfEpoch,
    every: u64,
    markers: BTreeMap<SelfEpoch, SpaceTimePosition>,
}

impl TrailMarkers {
    /// `every` of zero is treated as one.
    pub fn new(start: SelfEpoch, every: u64) -> Self {
        Self {
            start,
            every: every.max(1),
            markers: BTreeMap::new(),
        }
    }

    /// Whether `self_epoch` falls on the cadence.
    pub fn is_marker_epoch(&self, self_epoch: SelfEpoch) -> bool {
        self_epoch >= self.start && (self_epoch - self.start) % self.every == 0
    }

    /// Record (or refresh) the marker at `self_epoch` if it is on cadence.
    pub fn observe(&mut self, self_epoch: SelfEpoch, stp: SpaceTimePosition) {
        if self.is_marker_epoch(self_epoch) {
            self.markers.insert(self_epoch, stp);
        }
    }

    /// Drop markers a destruction made invisible.
    pub fn apply_destruction(&mut self, scope: DestructionScope) {
        self.markers.retain(|&self_epoch, _| scope.keeps(self_epoch));
    }

    pub fn get(&self, self_epoch: SelfEpoch) -> Option<&SpaceTimePosition> {
        self.markers.get(&self_epoch)
    }

    /// Markers in self-epoch order.
    pub fn iter(&self) -> impl Iterator<Item = (SelfEpoch, &SpaceTimePosition)> {
        self.markers.iter().map(|(&self_epoch, stp)| (self_epoch, stp))
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Segments and continuum markers
// ---------------------------------------------------------------------------

/// A line between two consecutive records of the same continuum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    /// Self-epoch of the later endpoint.
    pub self_epoch: SelfEpoch,
    pub from: SpaceTimePosition,
    pub to: SpaceTimePosition,
}

/// Segments between every pair of consecutive visible records, skipping
/// pairs where the later one is a teleport.
pub fn trail_segments(timeline: &Timeline) -> Vec<TrailSegment> {
    let records = timeline.ledger().records();
    records
        .windows(2)
        .zip(1u64..)
        .filter(|&(_, self_epoch)| timeline.is_visible(self_epoch))
        .filter_map(|(pair, self_epoch)| {
            let from = pair[0].space_time_position;
            let to = pair[1].space_time_position;
            (!is_discontinuity(Some(from.main_epoch), to.main_epoch)).then_some(TrailSegment {
                self_epoch,
                from,
                to,
            })
        })
        .collect()
}

/// First and (once closed) last marker of one continuum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuumMarkers {
    pub continuum: ContinuumId,
    pub first: SpaceTimePosition,
    pub last: Option<SpaceTimePosition>,
}

/// Markers for every continuum whose opening record is visible.
pub fn continuum_markers(timeline: &Timeline) -> Vec<ContinuumMarkers> {
    timeline
        .tracker()
        .iter()
        .filter(|(_, continuum)| timeline.is_visible(continuum.anchor_self_epoch))
        .map(|(id, continuum)| ContinuumMarkers {
            continuum: id,
            first: continuum.anchor,
            last: continuum
                .last_self_epoch
                .and_then(|last| timeline.record_at(last).ok())
                .map(|record| record.space_time_position),
        })
        .collect()
}

/// One marker per visible pass through `main_epoch`, oldest first.
pub fn propagation_markers(
    timeline: &Timeline,
    main_epoch: MainEpoch,
) -> Vec<(ContinuumId, SpaceTimePosition)> {
    timeline
        .continuums_covering_main_epoch(main_epoch)
        .filter_map(|(id, self_epoch)| {
            timeline
                .record_at(self_epoch)
                .ok()
                .map(|record| (id, record.space_time_position))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Renderable
// ---------------------------------------------------------------------------

/// What a view layer may ask of an object.
pub trait Renderable {
    fn render_style(&self) -> &RenderStyle;

    fn trail_markers(&self) -> &TrailMarkers;

    fn trail_segments(&self) -> Vec<TrailSegment>;

    fn continuum_markers(&self) -> Vec<ContinuumMarkers>;

    /// Where the object sits when the world clock shows `main_epoch`, if it
    /// was there at all.
    fn propagation_marker(&self, main_epoch: MainEpoch) -> Option<SpaceTimePosition>;

    /// Where the object sits at `main_epoch` on every continuum that passed
    /// through it.
    fn propagation_markers(&self, main_epoch: MainEpoch) -> Vec<(ContinuumId, SpaceTimePosition)>;
}
