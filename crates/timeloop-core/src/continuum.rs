//! Continuum tracking over a [`SpaceTimeLedger`].
//!
//! A *continuum* is a maximal stretch of a self timeline during which the
//! main epoch advances by exactly one per self-tick. While a continuum is
//! open, every main epoch it covers maps to a self-epoch through the affine
//! relation
//!
//! ```text
//! self_epoch = anchor_self_epoch + (main_epoch - first_main_epoch)
//! ```
//!
//! A *discontinuity* is any self-epoch whose main epoch is not exactly one
//! more than the previous record's. Self-epoch 0 is always one, and so is the
//! loop wrap from `total_ticks - 1` back to `0`: the expected-next main epoch
//! is computed without wrapping, so every pass around the loop lands in its
//! own continuum.
//!
//! The tracker is invoked after every ledger write:
//!
//! | discontinuity | already assigned | action                                   |
//! |---------------|------------------|------------------------------------------|
//! | yes           | no               | close previous continuum, open a new one |
//! | no            | no               | inherit the previous record's continuum  |
//! | yes           | yes              | refresh the continuum's anchor position  |
//! | no            | yes              | nothing                                  |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::SpaceTimeLedger;
use crate::spacetime::{MainEpoch, SelfEpoch, SpaceTimePosition};
use crate::{TimelineError, TimelineResult};

// ---------------------------------------------------------------------------
// ContinuumId
// ---------------------------------------------------------------------------

/// Index of a continuum within one object's tracker.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContinuumId(u32);

impl ContinuumId {
    #[inline]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ContinuumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuumId({})", self.0)
    }
}

impl fmt::Display for ContinuumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Continuum
// ---------------------------------------------------------------------------

/// One contiguous stretch of a self timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuum {
    /// Main epoch of the opening record.
    pub first_main_epoch: MainEpoch,
    /// Main epoch of the closing record; `None` while open.
    pub last_main_epoch: Option<MainEpoch>,
    /// Self-epoch of the opening record.
    pub anchor_self_epoch: SelfEpoch,
    /// Self-epoch of the closing record; `None` while open.
    pub last_self_epoch: Option<SelfEpoch>,
    /// Space-time position of the opening record, where a view draws the
    /// continuum's first marker.
    pub anchor: SpaceTimePosition,
}

impl Continuum {
    fn open(anchor_self_epoch: SelfEpoch, anchor: SpaceTimePosition) -> Self {
        Self {
            first_main_epoch: anchor.main_epoch,
            last_main_epoch: None,
            anchor_self_epoch,
            last_self_epoch: None,
            anchor,
        }
    }

    /// Still accepting contiguous records.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.last_main_epoch.is_none()
    }

    /// `first_main_epoch <= main_epoch <= last_main_epoch` (unbounded above
    /// while open).
    pub fn covers_main_epoch(&self, main_epoch: MainEpoch) -> bool {
        main_epoch >= self.first_main_epoch
            && self.last_main_epoch.map_or(true, |last| main_epoch <= last)
    }

    /// The affine map from main epoch to self-epoch, if covered and
    /// representable.
    pub fn self_epoch_for(&self, main_epoch: MainEpoch) -> Option<SelfEpoch> {
        if !self.covers_main_epoch(main_epoch) {
            return None;
        }
        self.anchor_self_epoch
            .checked_add(main_epoch - self.first_main_epoch)
    }

    fn close(&mut self, last_self_epoch: SelfEpoch, last_main_epoch: MainEpoch) {
        self.last_self_epoch = Some(last_self_epoch);
        self.last_main_epoch = Some(last_main_epoch);
    }
}

// ---------------------------------------------------------------------------
// ContinuumEvent
// ---------------------------------------------------------------------------

/// What the tracker did in response to one ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuumEvent {
    /// A discontinuity opened `opened`, closing `closed` if there was one.
    Opened {
        opened: ContinuumId,
        closed: Option<ContinuumId>,
    },
    /// The record joined the previous record's continuum.
    Extended(ContinuumId),
    /// A rewritten continuum-opening record refreshed its anchor position.
    AnchorRefreshed(ContinuumId),
    /// A rewritten record inside a continuum; nothing to do.
    Unchanged(ContinuumId),
}

impl ContinuumEvent {
    /// The continuum the written record belongs to afterwards.
    pub fn continuum(self) -> ContinuumId {
        match self {
            ContinuumEvent::Opened { opened, .. } => opened,
            ContinuumEvent::Extended(id)
            | ContinuumEvent::AnchorRefreshed(id)
            | ContinuumEvent::Unchanged(id) => id,
        }
    }
}

/// Whether a record at `main_epoch` breaks continuity with a previous
/// record at `previous` (`None` for self-epoch 0).
///
/// The expected next epoch is `previous + 1` without wrapping.
#[inline]
pub fn is_discontinuity(previous: Option<MainEpoch>, main_epoch: MainEpoch) -> bool {
    match previous {
        None => true,
        Some(previous) => previous.checked_add(1) != Some(main_epoch),
    }
}

// ---------------------------------------------------------------------------
// ContinuumTracker
// ---------------------------------------------------------------------------

/// All continuums of one object, in opening order.
///
/// Only the last continuum can be open. Continuums are never reopened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuumTracker {
    continuums: Vec<Continuum>,
}

impl ContinuumTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of continuums ever opened.
    pub fn len(&self) -> usize {
        self.continuums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.continuums.is_empty()
    }

    /// Every continuum with its id, in opening order.
    pub fn iter(&self) -> impl Iterator<Item = (ContinuumId, &Continuum)> {
        self.continuums
            .iter()
            .enumerate()
            .map(|(i, c)| (ContinuumId(i as u32), c))
    }

    /// Look up a continuum by id.
    pub fn continuum(&self, id: ContinuumId) -> TimelineResult<&Continuum> {
        self.continuums
            .get(id.0 as usize)
            .ok_or(TimelineError::UnknownContinuum(id))
    }

    fn continuum_mut(&mut self, id: ContinuumId) -> TimelineResult<&mut Continuum> {
        self.continuums
            .get_mut(id.0 as usize)
            .ok_or(TimelineError::UnknownContinuum(id))
    }

    /// The continuum currently accepting records, if any.
    pub fn open_continuum(&self) -> Option<(ContinuumId, &Continuum)> {
        self.iter().last().filter(|(_, c)| c.is_open())
    }

    /// Map `main_epoch` to a self-epoch through continuum `id`'s affine
    /// relation.
    pub fn self_epoch_for_main_epoch(
        &self,
        id: ContinuumId,
        main_epoch: MainEpoch,
    ) -> TimelineResult<SelfEpoch> {
        self.continuum(id)?
            .self_epoch_for(main_epoch)
            .ok_or(TimelineError::NotCovered {
                continuum: id,
                main_epoch,
            })
    }

    /// React to a write at `self_epoch`. See the module docs for the table.
    pub fn observe(
        &mut self,
        ledger: &mut SpaceTimeLedger,
        self_epoch: SelfEpoch,
    ) -> TimelineResult<ContinuumEvent> {
        let record = ledger.record(self_epoch)?;
        let stp = record.space_time_position;
        let assigned = record.continuum_id;
        let previous = match self_epoch.checked_sub(1) {
            Some(prev) => Some(ledger.record(prev)?),
            None => None,
        };
        let previous_main = previous.map(|r| r.main_epoch());
        let previous_continuum = previous.and_then(|r| r.continuum_id);
        let discontinuity = is_discontinuity(previous_main, stp.main_epoch);

        let event = match (discontinuity, assigned) {
            (true, None) => {
                let closed = match (previous_continuum, previous_main) {
                    (Some(id), Some(main)) => {
                        let continuum = self.continuum_mut(id)?;
                        if continuum.is_open() {
                            continuum.close(self_epoch - 1, main);
                            tracing::debug!(
                                continuum = %id,
                                last_self_epoch = self_epoch - 1,
                                last_main_epoch = main,
                                "continuum closed"
                            );
                        }
                        Some(id)
                    }
                    _ => None,
                };
                let opened = ContinuumId(self.continuums.len() as u32);
                self.continuums.push(Continuum::open(self_epoch, stp));
                ledger.set_continuum(self_epoch, opened);
                tracing::debug!(
                    continuum = %opened,
                    anchor_self_epoch = self_epoch,
                    first_main_epoch = stp.main_epoch,
                    "continuum opened"
                );
                ContinuumEvent::Opened { opened, closed }
            }
            (false, None) => match previous_continuum {
                Some(id) => {
                    ledger.set_continuum(self_epoch, id);
                    ContinuumEvent::Extended(id)
                }
                // Unreachable while the previous record was itself observed;
                // recover by treating the record as an opening one.
                None => {
                    let opened = ContinuumId(self.continuums.len() as u32);
                    self.continuums.push(Continuum::open(self_epoch, stp));
                    ledger.set_continuum(self_epoch, opened);
                    ContinuumEvent::Opened {
                        opened,
                        closed: None,
                    }
                }
            },
            (true, Some(id)) => {
                let continuum = self.continuum_mut(id)?;
                if continuum.anchor_self_epoch == self_epoch {
                    continuum.anchor = stp;
                }
                ContinuumEvent::AnchorRefreshed(id)
            }
            (false, Some(id)) => ContinuumEvent::Unchanged(id),
        };
        Ok(event)
    }

    /// Move continuum `id`'s affine anchor to a new main epoch.
    ///
    /// Only valid for a continuum whose records all moved together, which the
    /// timeline guarantees by rejecting any other main-epoch patch.
    pub(crate) fn re_anchor(
        &mut self,
        id: ContinuumId,
        old_main: MainEpoch,
        new_main: MainEpoch,
    ) -> TimelineResult<()> {
        let continuum = self.continuum_mut(id)?;
        continuum.first_main_epoch = new_main;
        continuum.anchor.main_epoch = new_main;
        if continuum.last_main_epoch == Some(old_main) {
            continuum.last_main_epoch = Some(new_main);
        }
        Ok(())
    }

    /// Close continuum `id` at `self_epoch`, shortening it if it ran past.
    pub(crate) fn truncate(
        &mut self,
        id: ContinuumId,
        self_epoch: SelfEpoch,
        main_epoch: MainEpoch,
    ) -> TimelineResult<()> {
        let continuum = self.continuum_mut(id)?;
        let ends_later = continuum.last_self_epoch.map_or(true, |last| last > self_epoch);
        if ends_later {
            continuum.close(self_epoch, main_epoch);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
