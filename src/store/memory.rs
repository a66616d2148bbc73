//! In-memory result store: tests and ephemeral use, explicitly not durable
//! (§4.10).

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::errors::Result;
use crate::core::model::{ScanId, ScanResult};
use crate::store::{Filter, Page, ResultStore, StoreStats};

/// Process-local, non-durable store. Every instance starts empty.
#[derive(Default)]
pub struct InMemoryStore {
    results: RwLock<HashMap<ScanId, ScanResult>>,
}

impl InMemoryStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryStore {
    async fn save(&self, result: &ScanResult) -> Result<()> {
        self.results.write().insert(result.scan_id, result.clone());
        Ok(())
    }

    async fn get(&self, scan_id: ScanId) -> Result<Option<ScanResult>> {
        Ok(self.results.read().get(&scan_id).cloned())
    }

    async fn delete(&self, scan_id: ScanId) -> Result<()> {
        self.results.write().remove(&scan_id);
        Ok(())
    }

    async fn list(&self, filter: &Filter, limit: usize, offset: usize) -> Result<Page> {
        let guard = self.results.read();
        let mut matching: Vec<ScanResult> = guard.values().filter(|r| filter.matches(r)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len();
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.results.read().values().filter(|r| filter.matches(r)).count())
    }

    async fn cleanup(&self, older_than: chrono::Duration) -> Result<usize> {
        let cutoff = chrono::Utc::now() - older_than;
        let mut guard = self.results.write();
        let before = guard.len();
        guard.retain(|_, r| r.created_at >= cutoff);
        Ok(before - guard.len())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            backend: "memory".to_string(),
            total_scans: self.results.read().len(),
        })
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::sample_result;

    #[tokio::test]
    async fn save_and_get_round_trips() {
        let store = InMemoryStore::new();
        let id = ScanId::new_v4();
        store.save(&sample_result(id, false)).await.unwrap();
        let fetched = store.get(id).await.unwrap().expect("should exist");
        assert_eq!(fetched.scan_id, id);
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let store = InMemoryStore::new();
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
    async fn delete_removes_the_result() {
        let store = InMemoryStore::new();
        let id = ScanId::new_v4();
        store.save(&sample_result(id, false)).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_by_created_at_descending() {
        let store = InMemoryStore::new();
        let older = sample_result(ScanId::new_v4(), false);
        let mut newer = sample_result(ScanId::new_v4(), false);
        newer.created_at = older.created_at + chrono::Duration::seconds(10);
        store.save(&older).await.unwrap();
        store.save(&newer).await.unwrap();

        let page = store.list(&Filter::default(), 10, 0).await.unwrap();
        assert_eq!(page.items[0].scan_id, newer.scan_id);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn cleanup_removes_results_older_than_the_cutoff() {
        let store = InMemoryStore::new();
        let mut old = sample_result(ScanId::new_v4(), false);
        old.created_at = chrono::Utc::now() - chrono::Duration::days(2);
        store.save(&old).await.unwrap();

        let removed = store.cleanup(chrono::Duration::days(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count(&Filter::default()).await.unwrap(), 0);
    }
}
