//! Daemon wiring for the consistency monitor.
//!
//! Owns config resolution, store construction, poller spawning, the periodic
//! snapshot summary, and signal-driven shutdown. Startup is fail-fast only
//! for configuration problems; an unreachable store is a runtime condition
//! the pollers retry on their own cadence.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use dw_config::{parse_table_ref, LoadedConfig};
use dw_engine::TableKey;
use dw_poller::{
    shared_reconciler, spawn_source_poller, spawn_target_poller, SharedReconciler,
    SourcePollerConfig, TargetPollerConfig,
};
use dw_store::{MySqlSourceStore, PgTargetStore, SourceStore, TargetStore};

pub struct RunOptions {
    pub config_path: String,
    pub local_config_path: Option<String>,
    /// CLI override for `source.schemas`.
    pub schemas_override: Option<Vec<String>>,
}

pub async fn run(opts: RunOptions) -> Result<()> {
    let mut paths = vec![opts.config_path.as_str()];
    if let Some(local) = opts.local_config_path.as_deref() {
        paths.push(local);
    }
    let LoadedConfig {
        mut config,
        config_hash,
    } = dw_config::load_layered(&paths)?;

    if let Some(schemas) = opts.schemas_override {
        info!(?schemas, "source schemas overridden from the command line");
        config.source.schemas = schemas;
    }
    config.validate()?;
    info!(%config_hash, "configuration loaded");

    let target_url = std::env::var(&config.target.url_env)
        .with_context(|| format!("missing env var {}", config.target.url_env))?;
    let source_url = std::env::var(&config.source.url_env)
        .with_context(|| format!("missing env var {}", config.source.url_env))?;

    let target_store: Arc<dyn TargetStore> = Arc::new(PgTargetStore::connect_lazy(
        &target_url,
        config.target.max_connections,
    )?);
    let source_store: Arc<dyn SourceStore> = Arc::new(MySqlSourceStore::connect_lazy(
        &source_url,
        config.source.max_connections,
    )?);

    let mut watch_list = Vec::with_capacity(config.target.tables.len());
    for entry in &config.target.tables {
        let (schema, table) = parse_table_ref(entry)?;
        watch_list.push(TableKey::new(schema, table));
    }

    let reconciler = shared_reconciler(config.monitor.max_tracked_tables);
    info!(run_id = %reconciler.read().await.run_id(), "engine starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let target_task = spawn_target_poller(
        target_store,
        Arc::clone(&reconciler),
        TargetPollerConfig {
            poll_interval: config.target.poll_interval(),
            query_timeout: config.target.query_timeout(),
            estimate_threshold_rows: config.target.estimate_threshold_rows,
            max_in_flight: config.monitor.max_in_flight_queries,
            ignored_table_prefixes: config.monitor.ignored_table_prefixes.clone(),
            watch: watch_list,
        },
        shutdown_rx.clone(),
    );
    let source_task = spawn_source_poller(
        source_store,
        Arc::clone(&reconciler),
        SourcePollerConfig {
            poll_interval: config.source.poll_interval(),
            query_timeout: config.source.query_timeout(),
            estimate_threshold_rows: config.source.estimate_threshold_rows,
            max_in_flight: config.monitor.max_in_flight_queries,
            ignored_table_prefixes: config.monitor.ignored_table_prefixes.clone(),
            schemas: config.source_schemas(),
        },
        shutdown_rx.clone(),
    );
    let summary_task = spawn_summary(
        Arc::clone(&reconciler),
        config.monitor.summary_interval(),
        shutdown_rx,
    );

    wait_for_shutdown().await?;
    info!("shutdown signal received; stopping pollers");
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(target_task, source_task, summary_task);

    let snapshot = reconciler.read().await.snapshot();
    info!(
        target_ticks = snapshot.target_ticks,
        source_ticks = snapshot.source_ticks,
        tables = snapshot.tables.len(),
        "engine stopped"
    );
    Ok(())
}

/// Periodic log-line consumer of engine snapshots — the in-repo stand-in for
/// an external renderer or alerting hook.
fn spawn_summary(
    reconciler: SharedReconciler,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
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

            let snap = reconciler.read().await.snapshot();
            info!(
                tables = snap.tables.len(),
                consistent = snap.consistent_tables(),
                inconsistent = snap.inconsistent_tables(),
                unknown = snap.unknown_tables(),
                target_rows = snap.total_target_rows(),
                source_rows = snap.total_source_rows(),
                delta = snap.total_delta(),
                target_ticks = snap.target_ticks,
                source_ticks = snap.source_ticks,
                "consistency summary"
            );
            if let Some(err) = &snap.last_target_error {
                warn!(at = %err.at, message = %err.message, "target store degraded");
            }
            if let Some(err) = &snap.last_source_error {
                warn!(at = %err.at, message = %err.message, "source store degraded");
            }
        }
    })
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("failed to listen for ctrl-c")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    Ok(())
}
