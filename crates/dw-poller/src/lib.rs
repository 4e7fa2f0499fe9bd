//! dw-poller
//!
//! The two periodic pollers feeding the reconciler: the target poller on a
//! fast cadence and the source aggregation poller on a slow one. Each runs
//! as an independent spawned task on its own timer, never waiting on the
//! other; per-table queries within a cycle fan out concurrently under a
//! bounded semaphore, each with its own timeout.
//!
//! Failures are recovered locally: a failed or timed-out table query is
//! logged and omitted from that cycle's batch, a failed cycle leaves stale
//! state behind. Nothing here can terminate the reconciler or the other
//! poller.

use std::sync::Arc;

use tokio::sync::RwLock;

use dw_engine::Reconciler;

mod aggregation;
mod target;

pub use aggregation::{poll_source_once, spawn_source_poller, SourcePollerConfig};
pub use target::{poll_target_once, spawn_target_poller, TargetPollerConfig};

/// Shared handle to the reconciler. The lock is scoped to a single merge or
/// snapshot copy and is never held across a store call.
pub type SharedReconciler = Arc<RwLock<Reconciler>>;

pub fn shared_reconciler(max_tracked_tables: usize) -> SharedReconciler {
    Arc::new(RwLock::new(Reconciler::new(max_tracked_tables)))
}

pub(crate) fn is_ignored(name: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|p| !p.is_empty() && name.starts_with(p))
}
