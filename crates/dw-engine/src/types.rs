use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row-count threshold at which a table is classified LARGE.
pub const LARGE_TABLE_ROWS: i64 = 1_000_000;

/// Row-count threshold at which a table is classified MEDIUM.
pub const MEDIUM_TABLE_ROWS: i64 = 100_000;

/// Identity of one monitored logical table: schema plus canonical name.
/// Immutable once derived.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey {
    pub schema: String,
    pub table: String,
}

impl TableKey {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Derived equality status between the target count and the aggregated
/// source total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Unknown,
    Consistent,
    Inconsistent,
}

/// Size classification from the target-side row count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn classify(rows: i64) -> Self {
        if rows >= LARGE_TABLE_ROWS {
            SizeClass::Large
        } else if rows >= MEDIUM_TABLE_ROWS {
            SizeClass::Medium
        } else {
            SizeClass::Small
        }
    }
}

/// Direction of the latest target-count delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
    Unknown,
}

/// Per-table reconciliation state.
///
/// Owned exclusively by the [`Reconciler`](crate::Reconciler); everything
/// else sees copies via [`Snapshot`]. `consistency`, `size_class`, and
/// `trend` are recomputed from the counts on every update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    /// Latest row count from the target store.
    pub target_count: Option<i64>,
    /// Target count before the latest update.
    pub previous_target_count: Option<i64>,
    /// Latest summed count across all source-side physical tables.
    pub source_total: Option<i64>,
    /// Physical tables that contributed to `source_total` in the last cycle.
    pub source_table_count: u32,
    /// True when `target_count` came from catalog statistics, not COUNT(*).
    pub target_estimated: bool,
    /// True when any constituent of `source_total` was estimated.
    pub source_estimated: bool,
    pub target_updated_at: Option<DateTime<Utc>>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub consistency: Consistency,
    /// Kept across updates whose target count is unknown.
    pub size_class: Option<SizeClass>,
    pub trend: Trend,
}

impl Default for Consistency {
    fn default() -> Self {
        Consistency::Unknown
    }
}

impl Default for Trend {
    fn default() -> Self {
        Trend::Unknown
    }
}

impl TableState {
    /// Latest target-count change, when two observations exist.
    pub fn delta(&self) -> Option<i64> {
        Some(self.target_count? - self.previous_target_count?)
    }

    /// Signed target-minus-source divergence, when both sides are known.
    pub fn divergence(&self) -> Option<i64> {
        Some(self.target_count? - self.source_total?)
    }

    pub(crate) fn recompute(&mut self) {
        self.trend = match (self.target_count, self.previous_target_count) {
            (Some(cur), Some(prev)) => match cur.cmp(&prev) {
                std::cmp::Ordering::Greater => Trend::Up,
                std::cmp::Ordering::Less => Trend::Down,
                std::cmp::Ordering::Equal => Trend::Flat,
            },
            _ => Trend::Unknown,
        };

        if let Some(rows) = self.target_count {
            self.size_class = Some(SizeClass::classify(rows));
        }

        self.consistency = match (self.target_count, self.source_total) {
            (Some(target), Some(source)) if target == source => Consistency::Consistent,
            (Some(_), Some(_)) => Consistency::Inconsistent,
            _ => Consistency::Unknown,
        };
    }
}

/// One table observation from the target store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetEntry {
    pub key: TableKey,
    pub rows: i64,
    pub estimated: bool,
}

/// Result of one target-poller cycle. Immutable once emitted; tables whose
/// query failed are absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetBatch {
    pub observed_at: DateTime<Utc>,
    pub entries: Vec<TargetEntry>,
}

/// One canonical-key aggregate from the source store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    pub key: TableKey,
    /// Sum over the physical tables queried successfully this cycle.
    pub total_rows: i64,
    /// How many physical tables contributed to `total_rows`.
    pub physical_tables: u32,
    pub estimated: bool,
}

/// Result of one aggregation-poller cycle, keyed by canonical name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceBatch {
    pub observed_at: DateTime<Utc>,
    pub entries: Vec<SourceEntry>,
}

/// Cycle-level failure for one store, latched until that store's next
/// successfully applied batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleError {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Immutable point-in-time copy of the full engine state.
///
/// Safe to read while the engine keeps merging batches: it is a copy, not a
/// live view, and a reader never observes a half-applied batch.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Target-poller batches applied so far.
    pub target_ticks: u64,
    /// Aggregation-poller batches applied so far.
    pub source_ticks: u64,
    /// Distinct tables refused by the tracking cap.
    pub dropped_tables: u64,
    pub last_target_error: Option<CycleError>,
    pub last_source_error: Option<CycleError>,
    pub tables: BTreeMap<TableKey, TableState>,
}

impl Snapshot {
    pub fn consistent_tables(&self) -> usize {
        self.count_with(Consistency::Consistent)
    }

    pub fn inconsistent_tables(&self) -> usize {
        self.count_with(Consistency::Inconsistent)
    }

    pub fn unknown_tables(&self) -> usize {
        self.count_with(Consistency::Unknown)
    }

    /// Sum of the known target counts.
    pub fn total_target_rows(&self) -> i64 {
        self.tables.values().filter_map(|s| s.target_count).sum()
    }

    /// Sum of the known source totals.
    pub fn total_source_rows(&self) -> i64 {
        self.tables.values().filter_map(|s| s.source_total).sum()
    }

    /// Net target-count movement across the latest deltas.
    pub fn total_delta(&self) -> i64 {
        self.tables.values().filter_map(|s| s.delta()).sum()
    }

    fn count_with(&self, consistency: Consistency) -> usize {
        self.tables
            .values()
            .filter(|s| s.consistency == consistency)
            .count()
    }
}
