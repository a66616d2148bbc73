//! File-tree result store: one JSON document per scan, sharded by status,
//! human-inspectable (§4.10).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::core::errors::{HardGatesError, Result};
use crate::core::model::{ScanId, ScanResult};
use crate::store::{Filter, Page, ResultStore, StoreStats};

/// Stores each scan as `<root>/<shard>/<scan_id>.json`, where `shard` is
/// `"incomplete"` or `"complete"` depending on the result's `incomplete` flag.
pub struct FileTreeStore {
    root: PathBuf,
}

impl FileTreeStore {
    /// Construct a store rooted at `root`, creating the shard directories
    /// if they don't already exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for shard in ["complete", "incomplete"] {
            std::fs::create_dir_all(root.join(shard))
                .map_err(|e| HardGatesError::storage_unavailable(e.to_string()))?;
        }
        Ok(Self { root })
    }

    fn shard_dir(&self, incomplete: bool) -> PathBuf {
        self.root.join(if incomplete { "incomplete" } else { "complete" })
    }

    fn path_for(&self, scan_id: ScanId, incomplete: bool) -> PathBuf {
        self.shard_dir(incomplete).join(format!("{scan_id}.json"))
    }

    fn find_existing(&self, scan_id: ScanId) -> Option<PathBuf> {
        for shard in ["complete", "incomplete"] {
            let candidate = self.root.join(shard).join(format!("{scan_id}.json"));
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    fn read_all(&self) -> Result<Vec<ScanResult>> {
        let mut results = Vec::new();
        for shard in ["complete", "incomplete"] {
            let dir = self.root.join(shard);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match read_result(&entry.path()) {
                    Ok(result) => results.push(result),
                    Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping unreadable scan result file"),
                }
            }
        }
        Ok(results)
    }
}

fn read_result(path: &Path) -> Result<ScanResult> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(Into::into)
}

#[async_trait]
impl ResultStore for FileTreeStore {
    async fn save(&self, result: &ScanResult) -> Result<()> {
        if let Some(existing) = self.find_existing(result.scan_id) {
            if existing != self.path_for(result.scan_id, result.incomplete) {
                std::fs::remove_file(&existing)?;
            }
        }
        let path = self.path_for(result.scan_id, result.incomplete);
        let content = serde_json::to_string_pretty(result)
            .map_err(|e| HardGatesError::storage_unavailable(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    async fn get(&self, scan_id: ScanId) -> Result<Option<ScanResult>> {
        match self.find_existing(scan_id) {
            Some(path) => Ok(Some(read_result(&path)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, scan_id: ScanId) -> Result<()> {
        if let Some(path) = self.find_existing(scan_id) {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    async fn list(&self, filter: &Filter, limit: usize, offset: usize) -> Result<Page> {
        let mut matching: Vec<ScanResult> = self.read_all()?.into_iter().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len();
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.read_all()?.into_iter().filter(|r| filter.matches(r)).count())
    }

    async fn cleanup(&self, older_than: chrono::Duration) -> Result<usize> {
        let cutoff = chrono::Utc::now() - older_than;
        let mut removed = 0usize;
        for result in self.read_all()? {
            if result.created_at < cutoff {
                self.delete(result.scan_id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            backend: "file".to_string(),
            total_scans: self.read_all()?.len(),
        })
    }

    async fn health(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(HardGatesError::storage_unavailable(format!(
                "store root {} does not exist",
                self.root.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::sample_result;

    #[tokio::test]
    async fn save_and_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTreeStore::new(dir.path()).unwrap();
        let id = ScanId::new_v4();
        store.save(&sample_result(id, false)).await.unwrap();
        let fetched = store.get(id).await.unwrap().expect("should exist");
        assert_eq!(fetched.scan_id, id);
    }

    #[tokio::test]
    async fn save_moves_between_shards_on_status_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTreeStore::new(dir.path()).unwrap();
        let id = ScanId::new_v4();
        store.save(&sample_result(id, true)).await.unwrap();
        assert!(dir.path().join("incomplete").join(format!("{id}.json")).exists());

        store.save(&sample_result(id, false)).await.unwrap();
        assert!(!dir.path().join("incomplete").join(format!("{id}.json")).exists());
        assert!(dir.path().join("complete").join(format!("{id}.json")).exists());
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTreeStore::new(dir.path()).unwrap();
        let id = ScanId::new_v4();
        store.save(&sample_result(id, false)).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn count_reflects_the_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTreeStore::new(dir.path()).unwrap();
        store.save(&sample_result(ScanId::new_v4(), true)).await.unwrap();
        store.save(&sample_result(ScanId::new_v4(), false)).await.unwrap();

        let filter = Filter {
            incomplete: Some(true),
            created_after: None,
        };
        assert_eq!(store.count(&filter).await.unwrap(), 1);
    }
}
