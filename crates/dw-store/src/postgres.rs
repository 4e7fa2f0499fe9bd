//! Postgres target-store client.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{query_error, StoreError, TargetStore};

/// sqlx-backed [`TargetStore`] over a Postgres pool.
pub struct PgTargetStore {
    pool: PgPool,
}

impl PgTargetStore {
    /// Build a lazily connecting pool. An unreachable server surfaces as a
    /// per-cycle query failure, not a startup failure; only a malformed URL
    /// errors here.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TargetStore for PgTargetStore {
    async fn approx_row_counts(
        &self,
        schema: &str,
    ) -> Result<HashMap<String, i64>, StoreError> {
        // Planner statistics keep this O(tables) regardless of row counts.
        // The insert/delete/update tally can transiently go negative after a
        // stats reset, hence the clamp.
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            select relname, greatest(n_tup_ins - n_tup_del + n_tup_upd, 0)::bigint
            from pg_stat_user_tables
            where schemaname = $1
            "#,
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(rows.into_iter().collect())
    }

    async fn exact_count(&self, schema: &str, table: &str) -> Result<i64, StoreError> {
        let sql = format!(
            "select count(*)::bigint from {}.{}",
            quote_ident(schema),
            quote_ident(table)
        );
        let (count,): (i64,) = sqlx::query_as(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error(schema, table, e))?;
        Ok(count)
    }
}

/// Double-quote an identifier, doubling any embedded quotes. Identifiers come
/// from catalog queries and config, not SQL parameters, so they must be
/// quoted inline.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
