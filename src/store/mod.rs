//! Result Store: one pluggable interface, four interchangeable backends
//! with identical semantics (§4.10).

pub mod file_tree;
pub mod memory;
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{HardGatesError, Result};
use crate::core::model::{ScanId, ScanResult};

impl From<sqlx::Error> for HardGatesError {
    fn from(source: sqlx::Error) -> Self {
        Self::StorageUnavailable {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}

/// Filter applied to `list`/`count`. All fields are conjunctive (AND'd).
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Keep only results whose `incomplete` flag matches, if set.
    pub incomplete: Option<bool>,
    /// Keep only results created at or after this time, if set.
    pub created_after: Option<DateTime<Utc>>,
}

impl Filter {
    fn matches(&self, result: &ScanResult) -> bool {
        if let Some(incomplete) = self.incomplete {
            if result.incomplete != incomplete {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if result.created_at < after {
                return false;
            }
        }
        true
    }
}

/// One page of a `list` call.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Results in this page, ordered by `created_at` descending.
    pub items: Vec<ScanResult>,
    /// Total count matching the filter, ignoring pagination.
    pub total: usize,
}

/// Point-in-time backend health/usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Backend identifier (`"kv"`, `"sql"`, `"file"`, `"memory"`).
    pub backend: String,
    /// Total scans currently stored.
    pub total_scans: usize,
}

/// Single interface implemented identically by every backend. Every
/// operation is idempotent by scan ID; `save` upserts.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Upsert a scan result.
    async fn save(&self, result: &ScanResult) -> Result<()>;

    /// Fetch a scan result by ID.
    async fn get(&self, scan_id: ScanId) -> Result<Option<ScanResult>>;

    /// Upsert, identical to `save` — kept as a distinct contract name to
    /// match callers that are semantically updating rather than creating.
    async fn update(&self, result: &ScanResult) -> Result<()> {
        self.save(result).await
    }

    /// Delete a scan result by ID. Not an error if the ID is unknown.
    async fn delete(&self, scan_id: ScanId) -> Result<()>;

    /// List results matching `filter`, newest-created first, paginated.
    async fn list(&self, filter: &Filter, limit: usize, offset: usize) -> Result<Page>;

    /// Count results matching `filter`, ignoring pagination.
    async fn count(&self, filter: &Filter) -> Result<usize>;

    /// Delete every result older than `older_than`, returning the count removed.
    async fn cleanup(&self, older_than: chrono::Duration) -> Result<usize>;

    /// Point-in-time backend statistics.
    async fn stats(&self) -> Result<StoreStats>;

    /// Liveness/readiness check for this backend.
    async fn health(&self) -> Result<()>;
}
