use chrono::Utc;
use dw_engine::{
    Consistency, Reconciler, SizeClass, SourceBatch, SourceEntry, TableKey, TargetBatch,
    TargetEntry,
};

fn key() -> TableKey {
    TableKey::new("sales", "orders")
}

#[test]
fn scenario_source_only_table_stays_unknown_indefinitely() {
    let mut rec = Reconciler::new(16);

    for _ in 0..5 {
        rec.apply_source_batch(&SourceBatch {
            observed_at: Utc::now(),
            entries: vec![SourceEntry {
                key: key(),
                total_rows: 42,
                physical_tables: 2,
                estimated: false,
            }],
        });
    }

    let state = &rec.snapshot().tables[&key()];
    assert_eq!(state.consistency, Consistency::Unknown);
    assert_eq!(state.target_count, None);
    assert_eq!(state.size_class, None);
}

#[test]
fn scenario_equal_half_million_counts_are_consistent_and_medium() {
    let mut rec = Reconciler::new(16);

    rec.apply_target_batch(&TargetBatch {
        observed_at: Utc::now(),
        entries: vec![TargetEntry {
            key: key(),
            rows: 500_000,
            estimated: false,
        }],
    });
    rec.apply_source_batch(&SourceBatch {
        observed_at: Utc::now(),
        entries: vec![SourceEntry {
            key: key(),
            total_rows: 500_000,
            physical_tables: 4,
            estimated: false,
        }],
    });

    let state = &rec.snapshot().tables[&key()];
    assert_eq!(state.consistency, Consistency::Consistent);
    assert_eq!(state.size_class, Some(SizeClass::Medium));
}

#[test]
fn scenario_unequal_counts_are_inconsistent_until_they_match_again() {
    let mut rec = Reconciler::new(16);

    rec.apply_target_batch(&TargetBatch {
        observed_at: Utc::now(),
        entries: vec![TargetEntry {
            key: key(),
            rows: 100,
            estimated: false,
        }],
    });
    rec.apply_source_batch(&SourceBatch {
        observed_at: Utc::now(),
        entries: vec![SourceEntry {
            key: key(),
            total_rows: 90,
            physical_tables: 1,
            estimated: false,
        }],
    });
    assert_eq!(
        rec.snapshot().tables[&key()].consistency,
        Consistency::Inconsistent
    );

    rec.apply_source_batch(&SourceBatch {
        observed_at: Utc::now(),
        entries: vec![SourceEntry {
            key: key(),
            total_rows: 100,
            physical_tables: 1,
            estimated: false,
        }],
    });
    assert_eq!(
        rec.snapshot().tables[&key()].consistency,
        Consistency::Consistent
    );
}
