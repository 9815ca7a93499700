//! Property tests for timeline writes.
//!
//! Random sequences of appends (contiguous steps, loop wraps and teleports)
//! and patches are applied to a single timeline, and the structural
//! invariants are checked after every step.

use proptest::prelude::*;
use timeloop_core::prelude::*;

const TOTAL_TICKS: u64 = 16;

#[derive(Debug, Clone)]
enum TimelineOp {
    /// Advance the main epoch by one, wrapping at `TOTAL_TICKS`.
    Step,
    /// Jump to an arbitrary main epoch.
    Teleport(u64),
    /// Patch position/heading of an existing self-epoch (by fraction of len).
    Nudge(usize, i32),
    /// Try to move an existing self-epoch's main epoch.
    Retime(usize, u64),
}

fn op_strategy() -> impl Strategy<Value = TimelineOp> {
    prop_oneof![
        6 => Just(TimelineOp::Step),
        2 => (0..TOTAL_TICKS).prop_map(TimelineOp::Teleport),
        1 => (0..64usize, -100i32..100).prop_map(|(i, d)| TimelineOp::Nudge(i, d)),
        1 => (0..64usize, 0..TOTAL_TICKS * 2).prop_map(|(i, m)| TimelineOp::Retime(i, m)),
    ]
}

fn record(main_epoch: MainEpoch) -> LedgerRecord {
    LedgerRecord::new(
        SpaceTimePosition::new(main_epoch, Vec2::ZERO, 0.0),
        SpaceSpeed::default(),
    )
}

fn check_invariants(timeline: &Timeline) {
    let ledger = timeline.ledger();
    let tracker = timeline.tracker();
    let records = ledger.records();

    // Contiguity and index consistency.
    assert_eq!(ledger.index().mapping_count() as u64, ledger.len());
    for (self_epoch, r) in records.iter().enumerate() {
        assert!(ledger
            .index()
            .self_epochs_at(r.main_epoch())
            .any(|s| s == self_epoch as u64));
    }

    // Every record belongs to a continuum, and ids never decrease.
    let mut last_id = None;
    for r in records {
        let id = r.continuum_id.expect("record without continuum");
        assert!(last_id.map_or(true, |last| last <= id));
        last_id = Some(id);
    }

    // Continuum boundaries are exactly the discontinuities.
    for (self_epoch, r) in records.iter().enumerate() {
        let previous = self_epoch
            .checked_sub(1)
            .map(|p| records[p].main_epoch());
        let opens = is_discontinuity(previous, r.main_epoch());
        let changes_id = self_epoch == 0
            || records[self_epoch - 1].continuum_id != r.continuum_id;
        assert_eq!(opens, changes_id, "boundary mismatch at {self_epoch}");
    }

    // Affine round trip through each record's own continuum.
    for (self_epoch, r) in records.iter().enumerate() {
        let id = r.continuum_id.unwrap();
        assert_eq!(
            tracker
                .self_epoch_for_main_epoch(id, r.main_epoch())
                .unwrap(),
            self_epoch as u64
        );
    }

    // Only the last continuum may be open.
    let open: Vec<_> = tracker.iter().filter(|(_, c)| c.is_open()).collect();
    assert!(open.len() <= 1);
    if let Some((id, _)) = open.first() {
        assert_eq!(id.index() as usize, tracker.len() - 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_writes_preserve_invariants(
        start in 0..TOTAL_TICKS,
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut timeline = Timeline::seeded(record(start));
        check_invariants(&timeline);

        for op in ops {
            match op {
                TimelineOp::Step => {
                    let main = timeline.latest().unwrap().1.main_epoch();
                    timeline.append(record((main + 1) % TOTAL_TICKS)).unwrap();
                }
                TimelineOp::Teleport(main) => {
                    timeline.append(record(main)).unwrap();
                }
                TimelineOp::Nudge(i, d) => {
                    let self_epoch = i as u64 % timeline.len();
                    let before = timeline.tracker().len();
                    let patch = RecordPatch::new()
                        .with_position(Vec2::new(d as f64, -d as f64))
                        .with_rotation(d as f64 * 0.01);
                    timeline.patch(self_epoch, &patch).unwrap();
                    prop_assert_eq!(timeline.tracker().len(), before);
                }
                TimelineOp::Retime(i, main) => {
                    let self_epoch = i as u64 % timeline.len();
                    let before = timeline.clone();
                    let patch = RecordPatch::new().with_main_epoch(main);
                    if timeline.patch(self_epoch, &patch).is_err() {
                        prop_assert_eq!(&timeline, &before);
                    }
                }
            }
            check_invariants(&timeline);
        }
    }

    #[test]
    fn loop_wrap_is_always_a_new_continuum(laps in 1u64..5) {
        let mut timeline = Timeline::seeded(record(0));
        for tick in 1..laps * TOTAL_TICKS {
            timeline.append(record(tick % TOTAL_TICKS)).unwrap();
        }
        prop_assert_eq!(timeline.tracker().len() as u64, laps);
        for (id, continuum) in timeline.tracker().iter() {
            prop_assert_eq!(continuum.first_main_epoch, 0);
            prop_assert_eq!(continuum.anchor_self_epoch, id.index() as u64 * TOTAL_TICKS);
        }
    }
}
