use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::types::{
    CycleError, Snapshot, SourceBatch, TableKey, TableState, TargetBatch,
};

/// Sole owner of the per-table state map.
///
/// All methods take `&self`/`&mut self` synchronously; the poller layer wraps
/// the reconciler in a shared lock held only for the duration of one merge or
/// one snapshot copy, never across a network call. Batches from the two
/// pollers may arrive in any interleaving; a merge is atomic with respect to
/// snapshot readers.
pub struct Reconciler {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    max_tracked_tables: usize,
    tables: BTreeMap<TableKey, TableState>,
    /// Keys refused by the tracking cap; each is warned about once per run.
    dropped: BTreeSet<TableKey>,
    target_ticks: u64,
    source_ticks: u64,
    last_target_error: Option<CycleError>,
    last_source_error: Option<CycleError>,
}

impl Reconciler {
    pub fn new(max_tracked_tables: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            max_tracked_tables,
            tables: BTreeMap::new(),
            dropped: BTreeSet::new(),
            target_ticks: 0,
            source_ticks: 0,
            last_target_error: None,
            last_source_error: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Merge one target-poller batch.
    ///
    /// For each entry the old target count becomes the previous count before
    /// being overwritten, then the derived fields are recomputed.
    pub fn apply_target_batch(&mut self, batch: &TargetBatch) {
        self.target_ticks += 1;
        self.last_target_error = None;

        for entry in &batch.entries {
            let Some(state) = self.state_for(&entry.key) else {
                continue;
            };
            state.previous_target_count = state.target_count;
            state.target_count = Some(entry.rows);
            state.target_estimated = entry.estimated;
            state.target_updated_at = Some(batch.observed_at);
            state.recompute();
        }
    }

    /// Merge one aggregation-poller batch.
    pub fn apply_source_batch(&mut self, batch: &SourceBatch) {
        self.source_ticks += 1;
        self.last_source_error = None;

        for entry in &batch.entries {
            let Some(state) = self.state_for(&entry.key) else {
                continue;
            };
            state.source_total = Some(entry.total_rows);
            state.source_table_count = entry.physical_tables;
            state.source_estimated = entry.estimated;
            state.source_updated_at = Some(batch.observed_at);
            state.recompute();
        }
    }

    /// Record a cycle-level target-store failure. Cleared by the next applied
    /// target batch.
    pub fn note_target_error(&mut self, message: impl Into<String>) {
        self.last_target_error = Some(CycleError {
            at: Utc::now(),
            message: message.into(),
        });
    }

    /// Record a cycle-level source-store failure. Cleared by the next applied
    /// source batch.
    pub fn note_source_error(&mut self, message: impl Into<String>) {
        self.last_source_error = Some(CycleError {
            at: Utc::now(),
            message: message.into(),
        });
    }

    /// Keys currently tracked, in stable order. The target poller unions this
    /// with its configured watch list so tables discovered by the aggregation
    /// poller get target counts on the next fast cycle.
    pub fn tracked_keys(&self) -> Vec<TableKey> {
        self.tables.keys().cloned().collect()
    }

    /// Immutable copy of the full state plus run-level metadata.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            run_id: self.run_id,
            started_at: self.started_at,
            target_ticks: self.target_ticks,
            source_ticks: self.source_ticks,
            dropped_tables: self.dropped.len() as u64,
            last_target_error: self.last_target_error.clone(),
            last_source_error: self.last_source_error.clone(),
            tables: self.tables.clone(),
        }
    }

    /// Locate or create the state for a key.
    ///
    /// Tracked keys always update. A key first seen after the cap is reached
    /// is refused deterministically (first-seen wins) and its batch entry is
    /// discarded.
    fn state_for(&mut self, key: &TableKey) -> Option<&mut TableState> {
        if !self.tables.contains_key(key) && self.tables.len() >= self.max_tracked_tables {
            if self.dropped.insert(key.clone()) {
                warn!(
                    table = %key,
                    cap = self.max_tracked_tables,
                    "table cap reached; new table will not be tracked"
                );
            }
            return None;
        }
        Some(self.tables.entry(key.clone()).or_default())
    }
}
