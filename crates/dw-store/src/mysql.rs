//! MySQL source-store client.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use crate::{query_error, SourceStore, StoreError};

/// sqlx-backed [`SourceStore`] over a MySQL pool.
///
/// One pool serves every configured schema scope; enumeration and estimates
/// go through `information_schema`, so no per-schema connection switching is
/// needed.
pub struct MySqlSourceStore {
    pool: MySqlPool,
}

impl MySqlSourceStore {
    /// Build a lazily connecting pool; see
    /// [`PgTargetStore::connect_lazy`](crate::PgTargetStore::connect_lazy).
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceStore for MySqlSourceStore {
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            select table_name
            from information_schema.tables
            where table_schema = ?
              and table_type = 'BASE TABLE'
            order by table_name
            "#,
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn approx_row_counts(
        &self,
        schema: &str,
    ) -> Result<HashMap<String, i64>, StoreError> {
        // table_rows is NULL for views and freshly analyzed tables.
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            select table_name, cast(coalesce(table_rows, 0) as signed)
            from information_schema.tables
            where table_schema = ?
              and table_type = 'BASE TABLE'
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
            "select cast(count(*) as signed) from {}.{}",
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

/// Backtick-quote an identifier, doubling any embedded backticks.
fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}
