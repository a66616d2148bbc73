//! Postgres result store: relational, networked, for multi-instance
//! deployments sharing one result store (§4.10).

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::core::errors::Result;
use crate::core::model::{ScanId, ScanResult};
use crate::store::{Filter, Page, ResultStore, StoreStats};

/// `ResultStore` backed by a single Postgres table, one row per scan.
/// Mirrors [`crate::store::sqlite::SqliteStore`]'s schema and query shape;
/// the JSON document remains the source of truth, indexed columns only
/// accelerate filtering.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to `url` (a `postgres://...` DSN) and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scan_results (
                scan_id     UUID PRIMARY KEY,
                incomplete  BOOLEAN NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL,
                document    JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scan_results_created_at ON scan_results (created_at)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_result(document: serde_json::Value) -> Result<ScanResult> {
        serde_json::from_value(document).map_err(Into::into)
    }
}

#[async_trait]
impl ResultStore for PostgresStore {
    async fn save(&self, result: &ScanResult) -> Result<()> {
        let document = serde_json::to_value(result)?;
        sqlx::query(
            r#"
            INSERT INTO scan_results (scan_id, incomplete, created_at, document)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (scan_id) DO UPDATE SET
                incomplete = excluded.incomplete,
                created_at = excluded.created_at,
                document = excluded.document
            "#,
        )
        .bind(result.scan_id)
        .bind(result.incomplete)
        .bind(result.created_at)
        .bind(document)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, scan_id: ScanId) -> Result<Option<ScanResult>> {
        let row = sqlx::query("SELECT document FROM scan_results WHERE scan_id = $1")
            .bind(scan_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_result(row.get::<serde_json::Value, _>("document")))
            .transpose()
    }

    async fn delete(&self, scan_id: ScanId) -> Result<()> {
        sqlx::query("DELETE FROM scan_results WHERE scan_id = $1")
            .bind(scan_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, filter: &Filter, limit: usize, offset: usize) -> Result<Page> {
        let rows = if let Some(incomplete) = filter.incomplete {
            sqlx::query("SELECT document FROM scan_results WHERE incomplete = $1 ORDER BY created_at DESC")
                .bind(incomplete)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query("SELECT document FROM scan_results ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?
        };

        let mut matching = Vec::with_capacity(rows.len());
        for row in rows {
            let result = Self::row_to_result(row.get::<serde_json::Value, _>("document"))?;
            if filter.matches(&result) {
                matching.push(result);
            }
        }
        let total = matching.len();
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.list(filter, usize::MAX, 0).await?.total)
    }

    async fn cleanup(&self, older_than: chrono::Duration) -> Result<usize> {
        let cutoff = chrono::Utc::now() - older_than;
        let outcome = sqlx::query("DELETE FROM scan_results WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(outcome.rows_affected() as usize)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM scan_results")
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreStats {
            backend: "sql".to_string(),
            total_scans: row.get::<i64, _>("total") as usize,
        })
    }

    async fn health(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
