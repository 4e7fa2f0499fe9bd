//! dw-engine
//!
//! Consistency reconciliation core.
//!
//! Architectural decisions:
//! - One owner for the per-table state map: the [`Reconciler`]
//! - Pollers produce immutable batches; they never touch the map directly
//! - Consistency, trend, and size class are derived, never stored on their own
//! - Consumers read immutable [`Snapshot`] copies, never the live map
//! - A table, once seen, is tracked until process teardown
//!
//! Deterministic, pure logic. No IO. No database calls.

mod reconciler;
mod types;

pub use reconciler::Reconciler;
pub use types::*;
