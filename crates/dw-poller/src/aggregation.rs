//! Source-store aggregation poller (slow cadence).
//!
//! Enumerates physical tables per schema scope, collapses them onto
//! canonical keys via `dw-namemap`, counts each physical table, and sums per
//! key. A physical table that fails to count is skipped; its contribution is
//! absent from that cycle's total rather than treated as zero rows, which
//! can transiently understate the total.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use dw_engine::{SourceBatch, SourceEntry, TableKey};
use dw_namemap::canonicalize;
use dw_store::SourceStore;

use crate::{is_ignored, SharedReconciler};

#[derive(Clone, Debug)]
pub struct SourcePollerConfig {
    pub poll_interval: Duration,
    pub query_timeout: Duration,
    pub estimate_threshold_rows: i64,
    pub max_in_flight: usize,
    pub ignored_table_prefixes: Vec<String>,
    /// Schema scopes to scan.
    pub schemas: Vec<String>,
}

/// Spawn the aggregation poller loop. Exits promptly when `shutdown` flips
/// to true, abandoning any in-flight cycle.
pub fn spawn_source_poller(
    store: Arc<dyn SourceStore>,
    reconciler: SharedReconciler,
    cfg: SourcePollerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = poll_source_once(&store, &reconciler, &cfg) => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
            if *shutdown.borrow() {
                break;
            }
        }
        debug!("source poller stopped");
    })
}

/// Run one aggregation cycle across every configured schema scope and apply
/// the batch.
pub async fn poll_source_once(
    store: &Arc<dyn SourceStore>,
    reconciler: &SharedReconciler,
    cfg: &SourcePollerConfig,
) {
    let started = Instant::now();
    let mut entries: Vec<SourceEntry> = Vec::new();
    let mut cycle_error: Option<String> = None;

    for schema in &cfg.schemas {
        match aggregate_schema(store, cfg, schema).await {
            Ok(mut schema_entries) => entries.append(&mut schema_entries),
            Err(message) => {
                warn!(%schema, %message, "source schema scan failed; scope skipped this cycle");
                cycle_error = Some(message);
            }
        }
    }

    let batch = SourceBatch {
        observed_at: Utc::now(),
        entries,
    };
    let applied = batch.entries.len();

    {
        let mut rec = reconciler.write().await;
        rec.apply_source_batch(&batch);
        if let Some(message) = cycle_error {
            rec.note_source_error(message);
        }
    }

    info!(
        canonical_tables = applied,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "source aggregation cycle complete"
    );
}

/// Enumerate, canonicalize, count, and sum one schema scope. Returns an Err
/// only for scope-level failures (enumeration); per-table failures are
/// handled inside.
async fn aggregate_schema(
    store: &Arc<dyn SourceStore>,
    cfg: &SourcePollerConfig,
    schema: &str,
) -> Result<Vec<SourceEntry>, String> {
    let tables = match timeout(cfg.query_timeout, store.list_tables(schema)).await {
        Ok(Ok(tables)) => tables,
        Ok(Err(err)) => return Err(err.to_string()),
        Err(_) => return Err(format!("table enumeration timed out for schema {schema}")),
    };

    let physical: Vec<String> = tables
        .into_iter()
        .filter(|t| !is_ignored(t, &cfg.ignored_table_prefixes))
        .collect();
    if physical.is_empty() {
        debug!(%schema, "no source tables in scope");
        return Ok(Vec::new());
    }

    // Estimates are advisory; if unavailable every table gets an exact count.
    let stats = match timeout(cfg.query_timeout, store.approx_row_counts(schema)).await {
        Ok(Ok(map)) => map,
        Ok(Err(err)) => {
            warn!(%schema, %err, "source statistics query failed; using exact counts");
            Default::default()
        }
        Err(_) => {
            warn!(%schema, "source statistics query timed out; using exact counts");
            Default::default()
        }
    };

    let semaphore = Arc::new(Semaphore::new(cfg.max_in_flight));
    let mut queries = Vec::with_capacity(physical.len());
    for table in physical {
        let canonical = canonicalize(&table);
        let estimate = stats.get(&table).copied();
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let schema = schema.to_string();
        let query_timeout = cfg.query_timeout;
        let threshold = cfg.estimate_threshold_rows;

        queries.push(async move {
            let _permit = semaphore.acquire().await.ok()?;
            match estimate {
                Some(rows) if rows >= threshold => Some((canonical, rows, true)),
                _ => match timeout(query_timeout, store.exact_count(&schema, &table)).await {
                    Ok(Ok(rows)) => Some((canonical, rows, false)),
                    Ok(Err(err)) => {
                        warn!(table = %format!("{schema}.{table}"), %err, "source count failed; constituent skipped");
                        None
                    }
                    Err(_) => {
                        warn!(table = %format!("{schema}.{table}"), "source count timed out; constituent skipped");
                        None
                    }
                },
            }
        });
    }

    // Sum per canonical key over the constituents that actually answered.
    let mut groups: BTreeMap<String, (i64, u32, bool)> = BTreeMap::new();
    for (canonical, rows, estimated) in join_all(queries).await.into_iter().flatten() {
        let slot = groups.entry(canonical).or_insert((0, 0, false));
        slot.0 += rows;
        slot.1 += 1;
        slot.2 |= estimated;
    }

    Ok(groups
        .into_iter()
        .map(|(canonical, (total_rows, physical_tables, estimated))| SourceEntry {
            key: TableKey::new(schema, canonical),
            total_rows,
            physical_tables,
            estimated,
        })
        .collect())
}
