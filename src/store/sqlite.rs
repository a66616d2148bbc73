//! SQLite result store: embedded, file-backed, the default `kv` backend
//! (§4.10).

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::core::errors::Result;
use crate::core::model::{ScanId, ScanResult};
use crate::store::{Filter, Page, ResultStore, StoreStats};

/// `ResultStore` backed by a single SQLite table, one row per scan.
/// `document` holds the full result as JSON; the indexed columns exist only
/// to make `list`/`count`/`cleanup` efficient without deserializing every row.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if absent) the SQLite database at `url`, e.g.
    /// `"sqlite://hardgates.db?mode=rwc"`, and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scan_results (
                scan_id     TEXT PRIMARY KEY,
                incomplete  INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                document    TEXT NOT NULL
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

    fn row_to_result(document: &str) -> Result<ScanResult> {
        serde_json::from_str(document).map_err(Into::into)
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn save(&self, result: &ScanResult) -> Result<()> {
        let document = serde_json::to_string(result)?;
        sqlx::query(
            r#"
            INSERT INTO scan_results (scan_id, incomplete, created_at, document)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(scan_id) DO UPDATE SET
                incomplete = excluded.incomplete,
                created_at = excluded.created_at,
                document = excluded.document
            "#,
        )
        .bind(result.scan_id.to_string())
        .bind(result.incomplete)
        .bind(result.created_at.to_rfc3339())
        .bind(document)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, scan_id: ScanId) -> Result<Option<ScanResult>> {
        let row = sqlx::query("SELECT document FROM scan_results WHERE scan_id = ?1")
            .bind(scan_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_result(row.get::<String, _>("document").as_str()))
            .transpose()
    }

    async fn delete(&self, scan_id: ScanId) -> Result<()> {
        sqlx::query("DELETE FROM scan_results WHERE scan_id = ?1")
            .bind(scan_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, filter: &Filter, limit: usize, offset: usize) -> Result<Page> {
        // Row-level filters beyond `incomplete` (e.g. created_after) are
        // applied in memory; the result set from a single tenant's history
        // is small enough that this stays cheap.
        let rows = if let Some(incomplete) = filter.incomplete {
            sqlx::query("SELECT document FROM scan_results WHERE incomplete = ?1 ORDER BY created_at DESC")
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
            let result = Self::row_to_result(row.get::<String, _>("document").as_str())?;
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
        let cutoff = (chrono::Utc::now() - older_than).to_rfc3339();
        let outcome = sqlx::query("DELETE FROM scan_results WHERE created_at < ?1")
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
            backend: "kv".to_string(),
            total_scans: row.get::<i64, _>("total") as usize,
        })
    }

    async fn health(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::sample_result;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn save_and_get_round_trips() {
        let store = store().await;
        let id = ScanId::new_v4();
        store.save(&sample_result(id, false)).await.unwrap();
        let fetched = store.get(id).await.unwrap().expect("should exist");
        assert_eq!(fetched.scan_id, id);
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let store = store().await;
        let id = ScanId::new_v4();
        store.save(&sample_result(id, false)).await.unwrap();
        let mut updated = sample_result(id, true);
        updated.overall_score = 42.0;
        store.save(&updated).await.unwrap();

        let fetched = store.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.overall_score, 42.0);
        assert!(fetched.incomplete);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = store().await;
        let id = ScanId::new_v4();
        store.save(&sample_result(id, false)).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_incomplete() {
        let store = store().await;
        store.save(&sample_result(ScanId::new_v4(), true)).await.unwrap();
        store.save(&sample_result(ScanId::new_v4(), false)).await.unwrap();

        let filter = Filter {
            incomplete: Some(true),
            created_after: None,
        };
        let page = store.list(&filter, 10, 0).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].incomplete);
    }

    #[tokio::test]
    async fn health_check_succeeds_on_a_live_pool() {
        let store = store().await;
        store.health().await.unwrap();
    }
}
