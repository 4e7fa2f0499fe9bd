//! Target-store poller (fast cadence).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use dw_engine::{TableKey, TargetBatch, TargetEntry};
use dw_store::TargetStore;

use crate::{is_ignored, SharedReconciler};

#[derive(Clone, Debug)]
pub struct TargetPollerConfig {
    pub poll_interval: Duration,
    pub query_timeout: Duration,
    /// Tables whose catalog estimate reaches this use the estimate instead
    /// of COUNT(*).
    pub estimate_threshold_rows: i64,
    pub max_in_flight: usize,
    pub ignored_table_prefixes: Vec<String>,
    /// Explicitly configured watch list; unioned with whatever the
    /// reconciler already tracks.
    pub watch: Vec<TableKey>,
}

/// Spawn the target poller loop. Exits promptly when `shutdown` flips to
/// true, abandoning any in-flight cycle.
pub fn spawn_target_poller(
    store: Arc<dyn TargetStore>,
    reconciler: SharedReconciler,
    cfg: TargetPollerConfig,
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
                _ = poll_target_once(&store, &reconciler, &cfg) => {}
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
        debug!("target poller stopped");
    })
}

/// Run one target poll cycle: resolve the watch list, pick estimate or exact
/// per table, fan out bounded concurrent queries, and apply the batch.
pub async fn poll_target_once(
    store: &Arc<dyn TargetStore>,
    reconciler: &SharedReconciler,
    cfg: &TargetPollerConfig,
) {
    let started = Instant::now();

    let mut watch_set: BTreeSet<TableKey> = cfg.watch.iter().cloned().collect();
    watch_set.extend(reconciler.read().await.tracked_keys());
    watch_set.retain(|k| !is_ignored(&k.table, &cfg.ignored_table_prefixes));

    if watch_set.is_empty() {
        debug!("target poll: nothing to watch yet");
        return;
    }

    // One statistics query per schema; a failure there degrades that
    // schema's tables to exact counts.
    let schemas: BTreeSet<String> = watch_set.iter().map(|k| k.schema.clone()).collect();
    let mut stats: HashMap<String, HashMap<String, i64>> = HashMap::new();
    let mut cycle_error: Option<String> = None;
    for schema in &schemas {
        match timeout(cfg.query_timeout, store.approx_row_counts(schema)).await {
            Ok(Ok(map)) => {
                stats.insert(schema.clone(), map);
            }
            Ok(Err(err)) => {
                warn!(%schema, %err, "target statistics query failed; using exact counts");
                cycle_error = Some(err.to_string());
            }
            Err(_) => {
                warn!(%schema, "target statistics query timed out; using exact counts");
                cycle_error = Some(format!("statistics query timed out for schema {schema}"));
            }
        }
    }

    let semaphore = Arc::new(Semaphore::new(cfg.max_in_flight));
    let mut queries = Vec::with_capacity(watch_set.len());
    for key in watch_set {
        let estimate = stats
            .get(&key.schema)
            .and_then(|m| m.get(&key.table))
            .copied();
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let query_timeout = cfg.query_timeout;
        let threshold = cfg.estimate_threshold_rows;

        queries.push(async move {
            let _permit = semaphore.acquire().await.ok()?;
            match estimate {
                Some(rows) if rows >= threshold => Some(TargetEntry {
                    key,
                    rows,
                    estimated: true,
                }),
                _ => match timeout(query_timeout, store.exact_count(&key.schema, &key.table)).await
                {
                    Ok(Ok(rows)) => Some(TargetEntry {
                        key,
                        rows,
                        estimated: false,
                    }),
                    Ok(Err(err)) => {
                        warn!(table = %key, %err, "target count failed; entry omitted");
                        None
                    }
                    Err(_) => {
                        warn!(table = %key, "target count timed out; entry omitted");
                        None
                    }
                },
            }
        });
    }

    let entries: Vec<TargetEntry> = join_all(queries).await.into_iter().flatten().collect();
    let batch = TargetBatch {
        observed_at: Utc::now(),
        entries,
    };
    let applied = batch.entries.len();

    {
        let mut rec = reconciler.write().await;
        rec.apply_target_batch(&batch);
        if let Some(message) = cycle_error {
            rec.note_target_error(message);
        }
    }

    info!(
        tables = applied,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "target poll cycle complete"
    );
}
