use chrono::Utc;
use dw_engine::{Reconciler, TableKey, TargetBatch, TargetEntry};

fn entry(table: &str, rows: i64) -> TargetEntry {
    TargetEntry {
        key: TableKey::new("sales", table),
        rows,
        estimated: false,
    }
}

#[test]
fn scenario_first_seen_tables_win_the_tracking_cap() {
    let mut rec = Reconciler::new(2);

    rec.apply_target_batch(&TargetBatch {
        observed_at: Utc::now(),
        entries: vec![entry("alpha", 1), entry("beta", 2), entry("gamma", 3)],
    });

    let snap = rec.snapshot();
    assert_eq!(snap.tables.len(), 2);
    assert!(snap.tables.contains_key(&TableKey::new("sales", "alpha")));
    assert!(snap.tables.contains_key(&TableKey::new("sales", "beta")));
    assert_eq!(snap.dropped_tables, 1);
}

#[test]
fn scenario_tracked_tables_keep_updating_after_cap_is_hit() {
    let mut rec = Reconciler::new(1);

    rec.apply_target_batch(&TargetBatch {
        observed_at: Utc::now(),
        entries: vec![entry("alpha", 1), entry("beta", 2)],
    });
    rec.apply_target_batch(&TargetBatch {
        observed_at: Utc::now(),
        entries: vec![entry("alpha", 10), entry("beta", 20)],
    });

    let snap = rec.snapshot();
    let alpha = &snap.tables[&TableKey::new("sales", "alpha")];
    assert_eq!(alpha.target_count, Some(10));
    assert_eq!(alpha.previous_target_count, Some(1));
    assert!(!snap.tables.contains_key(&TableKey::new("sales", "beta")));
    assert_eq!(snap.dropped_tables, 1, "refused key is counted once");
}
