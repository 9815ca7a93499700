//! The space-time ledger: one record per self-epoch, plus the inverse
//! main-epoch index.
//!
//! Self-epochs are contiguous: self-epoch `n` exists iff every epoch in
//! `0..n` exists. Records are only ever appended at the end or patched in
//! place; the ledger never shrinks.
//!
//! The [`MainTimelineIndex`] answers "which self-epochs were recorded at
//! main epoch M". A main epoch may map to several self-epochs once the loop
//! has repeated. Every append inserts a mapping; a patch that moves a record
//! to another main epoch removes the stale mapping first.
//!
//! Continuum assignment is not the ledger's concern. Records enter with no
//! continuum and the [`ContinuumTracker`](crate::continuum::ContinuumTracker)
//! fills it in after the write.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::continuum::ContinuumId;
use crate::spacetime::{MainEpoch, SelfEpoch, SpaceSpeed, SpaceTimePosition, Vec2};
use crate::{TimelineError, TimelineResult};

/// Hit points a record carries unless told otherwise.
pub const DEFAULT_HIT_POINTS: u32 = 1;

// ---------------------------------------------------------------------------
// LedgerRecord
// ---------------------------------------------------------------------------

/// Everything recorded about an object at one self-epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Position, heading and main epoch.
    pub space_time_position: SpaceTimePosition,
    /// Velocity and angular velocity committed at this epoch.
    pub space_speed: SpaceSpeed,
    /// Remaining hit points.
    pub hit_points: u32,
    /// Continuum this record belongs to. Assigned by the tracker.
    pub continuum_id: Option<ContinuumId>,
}

impl LedgerRecord {
    /// A record with default hit points and no continuum yet.
    pub fn new(space_time_position: SpaceTimePosition, space_speed: SpaceSpeed) -> Self {
        Self {
            space_time_position,
            space_speed,
            hit_points: DEFAULT_HIT_POINTS,
            continuum_id: None,
        }
    }

    /// Replace the hit points.
    pub fn with_hit_points(mut self, hit_points: u32) -> Self {
        self.hit_points = hit_points;
        self
    }

    /// Main epoch of this record.
    #[inline]
    pub fn main_epoch(&self) -> MainEpoch {
        self.space_time_position.main_epoch
    }
}

// ---------------------------------------------------------------------------
// RecordPatch
// ---------------------------------------------------------------------------

/// A partial update of a [`LedgerRecord`].
///
/// Only the fields that are `Some` are applied; everything else is left
/// untouched. The continuum assignment cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub main_epoch: Option<MainEpoch>,
    pub position: Option<Vec2>,
    pub rotation: Option<f64>,
    pub velocity: Option<Vec2>,
    pub angular_velocity: Option<f64>,
    pub hit_points: Option<u32>,
}

impl RecordPatch {
    /// A patch that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch that overwrites every patchable field with `record`'s values.
    pub fn from_record(record: &LedgerRecord) -> Self {
        Self {
            main_epoch: Some(record.space_time_position.main_epoch),
            position: Some(record.space_time_position.position),
            rotation: Some(record.space_time_position.rotation),
            velocity: Some(record.space_speed.velocity),
            angular_velocity: Some(record.space_speed.angular_velocity),
            hit_points: Some(record.hit_points),
        }
    }

    pub fn with_main_epoch(mut self, main_epoch: MainEpoch) -> Self {
        self.main_epoch = Some(main_epoch);
        self
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = Some(angular_velocity);
        self
    }

    pub fn with_hit_points(mut self, hit_points: u32) -> Self {
        self.hit_points = Some(hit_points);
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when the patch touches the position or heading, i.e. anything
    /// an oriented hitbox depends on.
    pub fn moves_body(&self) -> bool {
        self.position.is_some() || self.rotation.is_some()
    }

    /// Merge the present fields into `record`.
    pub fn apply_to(&self, record: &mut LedgerRecord) {
        let stp = &mut record.space_time_position;
        if let Some(main_epoch) = self.main_epoch {
            stp.main_epoch = main_epoch;
        }
        if let Some(position) = self.position {
            stp.position = position;
        }
        if let Some(rotation) = self.rotation {
            stp.rotation = rotation;
        }
        let speed = &mut record.space_speed;
        if let Some(velocity) = self.velocity {
            speed.velocity = velocity;
        }
        if let Some(angular_velocity) = self.angular_velocity {
            speed.angular_velocity = angular_velocity;
        }
        if let Some(hit_points) = self.hit_points {
            record.hit_points = hit_points;
        }
    }
}

// ---------------------------------------------------------------------------
// MainTimelineIndex
// ---------------------------------------------------------------------------

/// Inverse index: main epoch -> every self-epoch recorded there.
///
/// `BTreeMap`/`BTreeSet` keep iteration order (and serialized form)
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainTimelineIndex {
    entries: BTreeMap<MainEpoch, BTreeSet<SelfEpoch>>,
}

impl MainTimelineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, main_epoch: MainEpoch, self_epoch: SelfEpoch) {
        self.entries.entry(main_epoch).or_default().insert(self_epoch);
    }

    fn remove(&mut self, main_epoch: MainEpoch, self_epoch: SelfEpoch) {
        if let Some(set) = self.entries.get_mut(&main_epoch) {
            set.remove(&self_epoch);
            if set.is_empty() {
                self.entries.remove(&main_epoch);
            }
        }
    }

    /// Self-epochs recorded at `main_epoch`, ascending.
    pub fn self_epochs_at(&self, main_epoch: MainEpoch) -> impl Iterator<Item = SelfEpoch> + '_ {
        self.entries
            .get(&main_epoch)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Whether any self-epoch was recorded at `main_epoch`.
    pub fn contains(&self, main_epoch: MainEpoch) -> bool {
        self.entries.contains_key(&main_epoch)
    }

    /// Number of distinct main epochs with at least one record.
    pub fn main_epoch_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of (main, self) mappings. Equals the ledger length.
    pub fn mapping_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }
}

// ---------------------------------------------------------------------------
// SpaceTimeLedger
// ---------------------------------------------------------------------------

/// Contiguous, patchable per-object record store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceTimeLedger {
    records: Vec<LedgerRecord>,
    index: MainTimelineIndex,
}

impl SpaceTimeLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, i.e. the next self-epoch to be appended.
    #[inline]
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record at `self_epoch`, if written.
    pub fn get(&self, self_epoch: SelfEpoch) -> Option<&LedgerRecord> {
        usize::try_from(self_epoch)
            .ok()
            .and_then(|i| self.records.get(i))
    }

    /// The record at `self_epoch`, or `IndexOutOfRange`.
    pub fn record(&self, self_epoch: SelfEpoch) -> TimelineResult<&LedgerRecord> {
        self.get(self_epoch).ok_or(TimelineError::IndexOutOfRange {
            self_epoch,
            len: self.len(),
        })
    }

    /// All records in self-epoch order.
    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    /// The inverse main-epoch index.
    pub fn index(&self) -> &MainTimelineIndex {
        &self.index
    }

    /// Push `record` at the next contiguous self-epoch and return it.
    ///
    /// Any continuum assignment on the incoming record is discarded.
    pub fn append(&mut self, mut record: LedgerRecord) -> SelfEpoch {
        let self_epoch = self.len();
        record.continuum_id = None;
        self.index.insert(record.main_epoch(), self_epoch);
        self.records.push(record);
        self_epoch
    }

    /// Write `record` at an explicit self-epoch.
    ///
    /// `self_epoch == len` appends; an existing self-epoch is overwritten
    /// field by field (its continuum assignment is kept). Anything else is
    /// `OutOfOrder`.
    pub fn append_at(
        &mut self,
        self_epoch: SelfEpoch,
        record: LedgerRecord,
    ) -> TimelineResult<SelfEpoch> {
        let len = self.len();
        if self_epoch == len {
            return Ok(self.append(record));
        }
        if self_epoch < len {
            self.patch(self_epoch, &RecordPatch::from_record(&record))?;
            return Ok(self_epoch);
        }
        Err(TimelineError::OutOfOrder { self_epoch, len })
    }

    /// Merge `patch` into the record at `self_epoch`.
    ///
    /// Returns the record's main epoch from before the patch.
    pub fn patch(&mut self, self_epoch: SelfEpoch, patch: &RecordPatch) -> TimelineResult<MainEpoch> {
        let len = self.len();
        let record = usize::try_from(self_epoch)
            .ok()
            .and_then(|i| self.records.get_mut(i))
            .ok_or(TimelineError::IndexOutOfRange { self_epoch, len })?;

        let old_main = record.main_epoch();
        patch.apply_to(record);
        let new_main = record.main_epoch();

        if new_main != old_main {
            self.index.remove(old_main, self_epoch);
            self.index.insert(new_main, self_epoch);
        }
        Ok(old_main)
    }

    /// The most recent record.
    pub fn latest(&self) -> TimelineResult<(SelfEpoch, &LedgerRecord)> {
        self.records
            .last()
            .map(|record| (self.len() - 1, record))
            .ok_or(TimelineError::Empty)
    }

    pub(crate) fn set_continuum(&mut self, self_epoch: SelfEpoch, continuum: ContinuumId) {
        if let Some(record) = usize::try_from(self_epoch)
            .ok()
            .and_then(|i| self.records.get_mut(i))
        {
            record.continuum_id = Some(continuum);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(main_epoch: MainEpoch) -> LedgerRecord {
        LedgerRecord::new(
            SpaceTimePosition::new(main_epoch, Vec2::new(main_epoch as f64, 0.0), 0.0),
            SpaceSpeed::default(),
        )
    }

    #[test]
    fn append_is_contiguous() {
        let mut ledger = SpaceTimeLedger::new();
        for main in 0..5 {
            assert_eq!(ledger.append(record(main)), main);
        }
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.latest().unwrap().0, 4);
    }

    #[test]
    fn latest_on_empty_ledger_fails() {
        let ledger = SpaceTimeLedger::new();
        assert_eq!(ledger.latest().unwrap_err(), TimelineError::Empty);
    }

    #[test]
    fn append_discards_incoming_continuum() {
        let mut ledger = SpaceTimeLedger::new();
        let mut r = record(0);
        r.continuum_id = Some(ContinuumId::new(9));
        ledger.append(r);
        assert_eq!(ledger.get(0).unwrap().continuum_id, None);
    }

    #[test]
    fn append_at_rejects_gaps() {
        let mut ledger = SpaceTimeLedger::new();
        ledger.append(record(0));
        let err = ledger.append_at(5, record(1)).unwrap_err();
        assert_eq!(
            err,
            TimelineError::OutOfOrder {
                self_epoch: 5,
                len: 1
            }
        );
        assert_eq!(ledger.append_at(1, record(1)).unwrap(), 1);
        assert_eq!(ledger.append_at(0, record(7)).unwrap(), 0);
        assert_eq!(ledger.get(0).unwrap().main_epoch(), 7);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut ledger = SpaceTimeLedger::new();
        ledger.append(record(3).with_hit_points(4));
        ledger
            .patch(0, &RecordPatch::new().with_rotation(1.5))
            .unwrap();
        let patched = ledger.get(0).unwrap();
        assert_eq!(patched.space_time_position.rotation, 1.5);
        assert_eq!(patched.space_time_position.position, Vec2::new(3.0, 0.0));
        assert_eq!(patched.hit_points, 4);
    }

    #[test]
    fn patch_out_of_range_fails() {
        let mut ledger = SpaceTimeLedger::new();
        ledger.append(record(0));
        let err = ledger.patch(1, &RecordPatch::new()).unwrap_err();
        assert_eq!(
            err,
            TimelineError::IndexOutOfRange {
                self_epoch: 1,
                len: 1
            }
        );
    }

    #[test]
    fn patch_moves_index_entry() {
        let mut ledger = SpaceTimeLedger::new();
        ledger.append(record(2));
        ledger.append(record(3));
        let old = ledger
            .patch(1, &RecordPatch::new().with_main_epoch(8))
            .unwrap();
        assert_eq!(old, 3);
        assert!(!ledger.index().contains(3));
        assert_eq!(ledger.index().self_epochs_at(8).collect::<Vec<_>>(), vec![1]);
        assert_eq!(ledger.index().mapping_count(), 2);
    }

    #[test]
    fn empty_patch_is_noop() {
        let mut ledger = SpaceTimeLedger::new();
        ledger.append(record(2));
        let before = ledger.clone();
        assert!(RecordPatch::new().is_empty());
        ledger.patch(0, &RecordPatch::new()).unwrap();
        assert_eq!(ledger, before);
    }
}
