//! One object's complete temporal state: ledger, continuums and destruction.
//!
//! [`Timeline`] is the only way to write a ledger. Every write runs the
//! [`ContinuumTracker`] immediately afterwards, so the continuum structure
//! is never stale relative to the records.
//!
//! # Patching main epochs
//!
//! A patch that changes a record's main epoch is accepted only when it keeps
//! the discontinuity status of that record *and* of the next one. Everything
//! else would split or merge continuums and is rejected with
//! [`TimelineError::ContinuityConflict`] before anything is mutated. Under
//! that rule the patched record always opens a continuum that contains no
//! other record, so the continuum's affine anchor can simply move with it.

use serde::{Deserialize, Serialize};

use crate::continuum::{is_discontinuity, ContinuumEvent, ContinuumId, ContinuumTracker};
use crate::ledger::{LedgerRecord, RecordPatch, SpaceTimeLedger};
use crate::spacetime::{MainEpoch, SelfEpoch};
use crate::{TimelineError, TimelineResult};

// ---------------------------------------------------------------------------
// DestructionScope
// ---------------------------------------------------------------------------

/// How much of a timeline a destruction hides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestructionScope {
    /// Everything after `at` is gone; `at` itself is the last visible epoch.
    Truncate { at: SelfEpoch },
    /// The object never existed as far as queries are concerned.
    Full,
}

impl DestructionScope {
    /// Whether `self_epoch` is still visible under this scope.
    pub fn keeps(self, self_epoch: SelfEpoch) -> bool {
        match self {
            DestructionScope::Truncate { at } => self_epoch <= at,
            DestructionScope::Full => false,
        }
    }

    /// The narrower of two scopes.
    fn narrowest(self, other: DestructionScope) -> DestructionScope {
        match (self, other) {
            (DestructionScope::Truncate { at: a }, DestructionScope::Truncate { at: b }) => {
                DestructionScope::Truncate { at: a.min(b) }
            }
            _ => DestructionScope::Full,
        }
    }
}

// ---------------------------------------------------------------------------
// Written
// ---------------------------------------------------------------------------

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    /// Self-epoch the record landed at.
    pub self_epoch: SelfEpoch,
    /// What the continuum tracker did about it.
    pub event: ContinuumEvent,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    ledger: SpaceTimeLedger,
    tracker: ContinuumTracker,
    destruction: Option<DestructionScope>,
}

impl Timeline {
    /// A timeline with no records. It cannot be advanced until seeded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A timeline whose self-epoch 0 is `seed`.
    pub fn seeded(seed: LedgerRecord) -> Self {
        let mut timeline = Self::new();
        let self_epoch = timeline.ledger.append(seed);
        timeline.observe_infallible(self_epoch);
        timeline
    }

    pub fn ledger(&self) -> &SpaceTimeLedger {
        &self.ledger
    }

    pub fn tracker(&self) -> &ContinuumTracker {
        &self.tracker
    }

    /// Number of records.
    pub fn len(&self) -> u64 {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// The destruction applied to this timeline, if any.
    pub fn destruction(&self) -> Option<DestructionScope> {
        self.destruction
    }

    pub fn is_destroyed(&self) -> bool {
        self.destruction.is_some()
    }

    /// Whether `self_epoch` would be visible (ignores whether it exists).
    pub fn is_visible(&self, self_epoch: SelfEpoch) -> bool {
        self.destruction.map_or(true, |scope| scope.keeps(self_epoch))
    }

    fn ensure_visible(&self, self_epoch: SelfEpoch) -> TimelineResult<()> {
        if self.is_visible(self_epoch) {
            Ok(())
        } else {
            Err(TimelineError::Destroyed { self_epoch })
        }
    }

    /// Whether another record may still be appended.
    pub fn can_advance(&self) -> bool {
        !self.ledger.is_empty() && self.is_visible(self.ledger.len())
    }

    // -- writes -------------------------------------------------------------

    /// Append `record` at the next self-epoch and track continuums.
    pub fn append(&mut self, record: LedgerRecord) -> TimelineResult<Written> {
        let next = self.ledger.len();
        self.ensure_visible(next)?;
        let self_epoch = self.ledger.append(record);
        let event = self.tracker.observe(&mut self.ledger, self_epoch)?;
        self.seal_truncation()?;
        Ok(Written { self_epoch, event })
    }

    /// Write `record` at an explicit self-epoch: appends at the end,
    /// overwrites every field of an existing record, and rejects gaps with
    /// `OutOfOrder`.
    pub fn write_at(
        &mut self,
        self_epoch: SelfEpoch,
        record: LedgerRecord,
    ) -> TimelineResult<ContinuumEvent> {
        let len = self.ledger.len();
        if self_epoch == len {
            return self.append(record).map(|written| written.event);
        }
        if self_epoch < len {
            return self.patch(self_epoch, &RecordPatch::from_record(&record));
        }
        Err(TimelineError::OutOfOrder { self_epoch, len })
    }

    /// Merge `patch` into the record at `self_epoch`.
    pub fn patch(
        &mut self,
        self_epoch: SelfEpoch,
        patch: &RecordPatch,
    ) -> TimelineResult<ContinuumEvent> {
        let old_main = self.ledger.record(self_epoch)?.main_epoch();
        self.ensure_visible(self_epoch)?;

        let moved = patch.main_epoch.filter(|&new_main| new_main != old_main);
        if let Some(new_main) = moved {
            self.check_continuity(self_epoch, old_main, new_main)?;
        }

        self.ledger.patch(self_epoch, patch)?;
        if let Some(new_main) = moved {
            if let Some(id) = self.ledger.record(self_epoch)?.continuum_id {
                self.tracker.re_anchor(id, old_main, new_main)?;
            }
        }
        self.tracker.observe(&mut self.ledger, self_epoch)
    }

    fn check_continuity(
        &self,
        self_epoch: SelfEpoch,
        old_main: MainEpoch,
        new_main: MainEpoch,
    ) -> TimelineResult<()> {
        let previous = match self_epoch.checked_sub(1) {
            Some(prev) => Some(self.ledger.record(prev)?.main_epoch()),
            None => None,
        };
        let next = self.ledger.get(self_epoch + 1).map(LedgerRecord::main_epoch);

        let own_changes =
            is_discontinuity(previous, old_main) != is_discontinuity(previous, new_main);
        let next_changes = next.is_some_and(|next| {
            is_discontinuity(Some(old_main), next) != is_discontinuity(Some(new_main), next)
        });

        if own_changes || next_changes {
            tracing::warn!(
                self_epoch,
                old_main_epoch = old_main,
                new_main_epoch = new_main,
                "rejected main-epoch patch that would restructure continuums"
            );
            return Err(TimelineError::ContinuityConflict {
                self_epoch,
                old_main_epoch: old_main,
                new_main_epoch: new_main,
            });
        }
        Ok(())
    }

    // -- destruction --------------------------------------------------------

    /// Hide part or all of this timeline.
    ///
    /// A truncation closes the continuum covering its last visible epoch at
    /// that epoch. Destroying again can only narrow what remains visible.
    pub fn destroy(&mut self, scope: DestructionScope) -> TimelineResult<()> {
        let scope = match self.destruction {
            Some(existing) => existing.narrowest(scope),
            None => scope,
        };
        self.destruction = Some(scope);
        self.seal_truncation()
    }

    /// Close the continuum at a truncation point once it has been recorded,
    /// and close the open continuum if it begins after what stays visible.
    fn seal_truncation(&mut self) -> TimelineResult<()> {
        let Some(scope) = self.destruction else {
            return Ok(());
        };
        let hidden_open = self
            .tracker
            .open_continuum()
            .filter(|(_, open)| !scope.keeps(open.anchor_self_epoch))
            .map(|(id, _)| id);
        if let Some(id) = hidden_open {
            let (last, record) = self.ledger.latest()?;
            let main_epoch = record.main_epoch();
            self.tracker.truncate(id, last, main_epoch)?;
        }

        let DestructionScope::Truncate { at } = scope else {
            return Ok(());
        };
        let Some(record) = self.ledger.get(at) else {
            return Ok(());
        };
        let main_epoch = record.main_epoch();
        if let Some(id) = record.continuum_id {
            self.tracker.truncate(id, at, main_epoch)?;
        }
        Ok(())
    }

    // -- reads --------------------------------------------------------------

    /// The most recent visible record.
    pub fn latest(&self) -> TimelineResult<(SelfEpoch, &LedgerRecord)> {
        let (self_epoch, record) = self.ledger.latest()?;
        match self.destruction {
            None => Ok((self_epoch, record)),
            Some(DestructionScope::Full) => Err(TimelineError::Destroyed { self_epoch: 0 }),
            Some(DestructionScope::Truncate { at }) if self_epoch > at => {
                let record = self.ledger.record(at)?;
                Ok((at, record))
            }
            Some(DestructionScope::Truncate { .. }) => Ok((self_epoch, record)),
        }
    }

    /// The record at `self_epoch`, unless out of range or destroyed.
    pub fn record_at(&self, self_epoch: SelfEpoch) -> TimelineResult<&LedgerRecord> {
        let record = self.ledger.record(self_epoch)?;
        self.ensure_visible(self_epoch)?;
        Ok(record)
    }

    /// Self-epoch at `main_epoch` through continuum `id`, checking that the
    /// answer is visible.
    pub fn self_epoch_for_main_epoch(
        &self,
        id: ContinuumId,
        main_epoch: MainEpoch,
    ) -> TimelineResult<SelfEpoch> {
        let self_epoch = self.tracker.self_epoch_for_main_epoch(id, main_epoch)?;
        self.ensure_visible(self_epoch)?;
        Ok(self_epoch)
    }

    /// The most recent visible pass through `main_epoch`, with its continuum.
    pub fn continuum_covering_main_epoch(
        &self,
        main_epoch: MainEpoch,
    ) -> Option<(ContinuumId, SelfEpoch)> {
        self.continuums_covering_main_epoch(main_epoch).last()
    }

    /// Every visible pass through `main_epoch`, oldest first.
    pub fn continuums_covering_main_epoch(
        &self,
        main_epoch: MainEpoch,
    ) -> impl Iterator<Item = (ContinuumId, SelfEpoch)> + '_ {
        self.ledger
            .index()
            .self_epochs_at(main_epoch)
            .filter(move |&self_epoch| self.is_visible(self_epoch))
            .filter_map(move |self_epoch| {
                self.ledger
                    .get(self_epoch)
                    .and_then(|record| record.continuum_id)
                    .map(|id| (id, self_epoch))
            })
    }

    fn observe_infallible(&mut self, self_epoch: SelfEpoch) {
        // Observing a record that was just appended cannot fail.
        if let Err(error) = self.tracker.observe(&mut self.ledger, self_epoch) {
            tracing::warn!(%error, self_epoch, "continuum tracking failed on seed record");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
