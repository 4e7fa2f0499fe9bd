use chrono::Utc;
use dw_engine::{Reconciler, TableKey, TargetBatch, TargetEntry};

fn batch(rows: i64) -> TargetBatch {
    TargetBatch {
        observed_at: Utc::now(),
        entries: vec![TargetEntry {
            key: TableKey::new("sales", "orders"),
            rows,
            estimated: false,
        }],
    }
}

#[test]
fn scenario_snapshot_is_a_copy_unaffected_by_later_merges() {
    let mut rec = Reconciler::new(16);
    rec.apply_target_batch(&batch(100));

    let before = rec.snapshot();
    rec.apply_target_batch(&batch(999));
    let after = rec.snapshot();

    let key = TableKey::new("sales", "orders");
    assert_eq!(before.tables[&key].target_count, Some(100));
    assert_eq!(after.tables[&key].target_count, Some(999));
    assert_eq!(before.target_ticks, 1);
    assert_eq!(after.target_ticks, 2);
}

#[test]
fn scenario_count_and_timestamp_update_together() {
    let mut rec = Reconciler::new(16);
    rec.apply_target_batch(&batch(100));

    for state in rec.snapshot().tables.values() {
        assert_eq!(
            state.target_updated_at.is_some(),
            state.target_count.is_some(),
            "target fields must be set atomically together"
        );
        assert_eq!(
            state.source_updated_at.is_some(),
            state.source_total.is_some(),
            "source fields must be set atomically together"
        );
    }
}
