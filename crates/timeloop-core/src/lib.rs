//! Timeloop Core -- per-object timelines on a cyclic world clock.
//!
//! The world clock (the *main timeline*) is a fixed-length loop of
//! `total_ticks` epochs that repeats forever. Every temporal object also has
//! its own linear *self timeline*: one [`LedgerRecord`](ledger::LedgerRecord)
//! per tick since the object was created, each tagged with the main-timeline
//! epoch it belongs to.
//!
//! This crate keeps the two clocks consistent:
//!
//! - [`ledger::SpaceTimeLedger`] stores records contiguously by self-epoch and
//!   maintains the inverse main-epoch -> self-epoch index.
//! - [`continuum::ContinuumTracker`] segments the self timeline into maximal
//!   stretches where the main epoch advances by exactly one per tick.
//! - [`timeline::Timeline`] is the single write path combining both, plus the
//!   object's destruction state.
//! - [`lifecycle::LifecycleGraph`] records parent/child creation and computes
//!   cascading destruction.
//!
//! # Quick Start
//!
//! ```
//! use timeloop_core::prelude::*;
//!
//! let seed = LedgerRecord::new(
//!     SpaceTimePosition::new(0, Vec2::ZERO, 0.0),
//!     SpaceSpeed::new(Vec2::new(1.0, 0.0), 0.0),
//! );
//! let mut timeline = Timeline::seeded(seed);
//!
//! // Main epoch 1 follows 0: same continuum.
//! let next = LedgerRecord::new(
//!     SpaceTimePosition::new(1, Vec2::new(1.0, 0.0), 0.0),
//!     SpaceSpeed::new(Vec2::new(1.0, 0.0), 0.0),
//! );
//! timeline.append(next).unwrap();
//! assert_eq!(timeline.tracker().len(), 1);
//!
//! // Jumping to main epoch 40 is a teleport: a new continuum opens.
//! let jump = LedgerRecord::new(
//!     SpaceTimePosition::new(40, Vec2::ZERO, 0.0),
//!     SpaceSpeed::default(),
//! );
//! timeline.append(jump).unwrap();
//! assert_eq!(timeline.tracker().len(), 2);
//! assert_eq!(timeline.continuum_covering_main_epoch(40).unwrap().1, 2);
//! ```

#![deny(unsafe_code)]

pub mod continuum;
pub mod entity;
pub mod ledger;
pub mod lifecycle;
pub mod spacetime;
pub mod timeline;

use continuum::ContinuumId;
use entity::EntityId;
use spacetime::{MainEpoch, SelfEpoch};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by timeline operations.
///
/// Every error is local to one object's timeline, and a rejected operation
/// leaves that timeline unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    /// The object has no seed record, so there is nothing to advance from.
    #[error("timeline has no seed record; construct it with an initial space-time position")]
    Uninitialized,

    /// The ledger holds no record at all.
    #[error("ledger is empty")]
    Empty,

    /// A read or patch addressed a self-epoch that has not been written.
    #[error("self-epoch {self_epoch} is out of range (ledger length {len})")]
    IndexOutOfRange {
        self_epoch: SelfEpoch,
        len: u64,
    },

    /// An explicit-index write was neither an append nor an existing epoch.
    #[error("self-epoch {self_epoch} written out of order (ledger length {len})")]
    OutOfOrder {
        self_epoch: SelfEpoch,
        len: u64,
    },

    /// The continuum does not span the requested main epoch.
    #[error("continuum {continuum} does not cover main epoch {main_epoch}")]
    NotCovered {
        continuum: ContinuumId,
        main_epoch: MainEpoch,
    },

    /// The continuum id was never issued by this timeline.
    #[error("continuum {0} does not exist on this timeline")]
    UnknownContinuum(ContinuumId),

    /// The self-epoch lies past the object's destruction point.
    #[error("object is destroyed at self-epoch {self_epoch}")]
    Destroyed {
        self_epoch: SelfEpoch,
    },

    /// A patch would move a record's main epoch in a way that changes which
    /// continuum its neighbours belong to.
    #[error(
        "patching self-epoch {self_epoch} from main epoch {old_main_epoch} to {new_main_epoch} \
         would restructure its continuums"
    )]
    ContinuityConflict {
        self_epoch: SelfEpoch,
        old_main_epoch: MainEpoch,
        new_main_epoch: MainEpoch,
    },

    /// An object cannot be its own parent.
    #[error("entity {0} cannot create itself")]
    SelfParent(EntityId),

    /// A child already has a recorded parent.
    #[error("entity {child} already has parent {parent}")]
    AlreadyParented {
        child: EntityId,
        parent: EntityId,
    },

    /// Linking would make an object its own ancestor.
    #[error("linking {parent} -> {child} would create a lifecycle cycle")]
    LifecycleCycle {
        parent: EntityId,
        child: EntityId,
    },
}

/// Shorthand result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::continuum::{
        is_discontinuity, Continuum, ContinuumEvent, ContinuumId, ContinuumTracker,
    };
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::ledger::{LedgerRecord, MainTimelineIndex, RecordPatch, SpaceTimeLedger};
    pub use crate::lifecycle::{DestructionOrder, LifecycleGraph, ParentChildLink};
    pub use crate::spacetime::{
        orient_polygon, MainEpoch, SelfEpoch, SpaceSpeed, SpaceTimePosition, Vec2,
    };
    pub use crate::timeline::{DestructionScope, Timeline, Written};
    pub use crate::{TimelineError, TimelineResult};
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn record(main_epoch: MainEpoch, x: f64) -> LedgerRecord {
        LedgerRecord::new(
            SpaceTimePosition::new(main_epoch, Vec2::new(x, 0.0), 0.0),
            SpaceSpeed::new(Vec2::new(1.0, 0.0), 0.0),
        )
    }

    #[test]
    fn loop_wrap_opens_new_continuum() {
        let total_ticks = 5;
        let mut timeline = Timeline::seeded(record(0, 0.0));
        for tick in 1..=total_ticks {
            timeline
                .append(record(tick % total_ticks, tick as f64))
                .unwrap();
        }
        // Self-epochs 0..=4 share continuum 0; the wrap back to 0 opens c1.
        assert_eq!(timeline.tracker().len(), 2);
        let first = timeline.tracker().continuum(ContinuumId::new(0)).unwrap();
        assert_eq!(first.last_main_epoch, Some(4));
        let second = timeline.tracker().continuum(ContinuumId::new(1)).unwrap();
        assert_eq!(second.anchor_self_epoch, 5);
        assert_eq!(second.first_main_epoch, 0);
    }

    #[test]
    fn repeated_main_epoch_maps_to_several_self_epochs() {
        let mut timeline = Timeline::seeded(record(3, 0.0));
        timeline.append(record(4, 1.0)).unwrap();
        timeline.append(record(3, 2.0)).unwrap();
        let at_three: Vec<SelfEpoch> = timeline.ledger().index().self_epochs_at(3).collect();
        assert_eq!(at_three, vec![0, 2]);
        // The most recent pass wins.
        let (continuum, self_epoch) = timeline.continuum_covering_main_epoch(3).unwrap();
        assert_eq!(self_epoch, 2);
        assert_eq!(continuum, ContinuumId::new(1));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = TimelineError::IndexOutOfRange {
            self_epoch: 9,
            len: 3,
        };
        assert_eq!(
            err.to_string(),
            "self-epoch 9 is out of range (ledger length 3)"
        );
        let err = TimelineError::NotCovered {
            continuum: ContinuumId::new(2),
            main_epoch: 17,
        };
        assert!(err.to_string().contains("c2"));
    }
}
