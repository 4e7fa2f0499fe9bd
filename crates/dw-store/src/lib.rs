//! dw-store
//!
//! Store boundary for the consistency monitor.
//!
//! This module defines the count-query contracts and the error type; the
//! sqlx-backed implementations live in `postgres.rs` (target store) and
//! `mysql.rs` (source store). Pollers depend on the traits only, so tests
//! drive them with in-process mocks and no database.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

mod mysql;
mod postgres;

pub use mysql::MySqlSourceStore;
pub use postgres::PgTargetStore;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a store client may return.
#[derive(Debug)]
pub enum StoreError {
    /// The store itself could not be reached or queried at schema level.
    Connection(String),
    /// A single table's count query failed; other tables are unaffected.
    Query { table: String, message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "store connection error: {msg}"),
            StoreError::Query { table, message } => {
                write!(f, "count query failed for {table}: {message}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Target store (system of record for current truth), polled on the fast
/// cadence.
///
/// Implementations must be object-safe and `Send + Sync` so pollers can hold
/// an `Arc<dyn TargetStore>` across task boundaries.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Statistics-based row estimates for every user table in `schema`,
    /// keyed by table name. Used instead of a full scan for large tables.
    async fn approx_row_counts(&self, schema: &str)
        -> Result<HashMap<String, i64>, StoreError>;

    /// Exact `COUNT(*)` for one table.
    async fn exact_count(&self, schema: &str, table: &str) -> Result<i64, StoreError>;
}

/// Source store (CDC-fed origin), polled on the slow cadence.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Names of the base tables in `schema`.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, StoreError>;

    /// Catalog row estimates for every base table in `schema`.
    async fn approx_row_counts(&self, schema: &str)
        -> Result<HashMap<String, i64>, StoreError>;

    /// Exact `COUNT(*)` for one physical table.
    async fn exact_count(&self, schema: &str, table: &str) -> Result<i64, StoreError>;
}

pub(crate) fn query_error(schema: &str, table: &str, err: sqlx::Error) -> StoreError {
    StoreError::Query {
        table: format!("{schema}.{table}"),
        message: err.to_string(),
    }
}
