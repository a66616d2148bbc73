//! Job Registry: an in-memory map from scan ID to [`ScanJob`] snapshot
//! (§4.9).
//!
//! Snapshots are value objects returned by copy; mutation happens only
//! through the owning pipeline via [`JobRegistry::update`]. Reads are
//! lock-free once the snapshot pointer is atomically swapped, using the
//! same `arc-swap` pattern the teacher crate uses for its detector
//! registry snapshots.

pub mod sweeper;

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use parking_lot::Mutex;

use crate::core::errors::{HardGatesError, Result};
use crate::core::model::{JobError, JobState, ScanId, ScanJob};

type Snapshot = Arc<HashMap<ScanId, Arc<ScanJob>>>;

/// Thread-safe registry of in-flight and recently-completed scan jobs.
///
/// Writers serialize through an internal mutex (one pipeline owns a given
/// scan ID at a time, so contention is low); readers dereference the
/// current `ArcSwap` snapshot without ever blocking on that mutex.
pub struct JobRegistry {
    snapshot: ArcSwap<HashMap<ScanId, Arc<ScanJob>>>,
    write_lock: Mutex<()>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Insert a freshly-created job.
    pub fn insert(&self, job: ScanJob) {
        let _guard = self.write_lock.lock();
        let current = self.snapshot.load();
        let mut next: HashMap<ScanId, Arc<ScanJob>> = (**current).clone();
        next.insert(job.scan_id, Arc::new(job));
        self.snapshot.store(Arc::new(next));
    }

    /// Look up a job's current snapshot by scan ID.
    pub fn get(&self, scan_id: ScanId) -> Option<Arc<ScanJob>> {
        self.snapshot.load().get(&scan_id).cloned()
    }

    /// Apply `mutate` to the job named `scan_id` and publish the result.
    /// `updated_at` is bumped automatically; terminal states additionally
    /// set `completed_at`.
    pub fn update(&self, scan_id: ScanId, mutate: impl FnOnce(&mut ScanJob)) -> Result<()> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot.load();
        let mut next: HashMap<ScanId, Arc<ScanJob>> = (**current).clone();

        let Some(existing) = next.get(&scan_id) else {
            return Err(HardGatesError::invalid_request(format!(
                "no such scan: {scan_id}"
            )));
        };

        let mut job = (**existing).clone();
        mutate(&mut job);
        job.updated_at = Utc::now();
        if job.state.is_terminal() && job.completed_at.is_none() {
            job.completed_at = Some(job.updated_at);
        }

        next.insert(scan_id, Arc::new(job));
        self.snapshot.store(Arc::new(next));
        Ok(())
    }

    /// Record progress without changing lifecycle state. Progress is
    /// clamped to be non-decreasing, per §5's monotonicity guarantee.
    pub fn advance(&self, scan_id: ScanId, percent: f64, step: &str, detail: &str) -> Result<()> {
        self.update(scan_id, |job| {
            job.progress_percent = job.progress_percent.max(percent).min(100.0);
            job.current_step = step.to_string();
            job.step_detail = detail.to_string();
        })
    }

    /// Append a recoverable error without failing the job.
    pub fn record_error(&self, scan_id: ScanId, stage: &str, message: &str) -> Result<()> {
        self.update(scan_id, |job| {
            job.errors.push(JobError {
                stage: stage.to_string(),
                message: message.to_string(),
                occurred_at: Utc::now(),
            });
        })
    }

    /// Transition a job to a terminal state.
    pub fn finish(&self, scan_id: ScanId, state: JobState, incomplete: bool) -> Result<()> {
        self.update(scan_id, |job| {
            job.state = state;
            job.incomplete = incomplete;
            if matches!(state, JobState::Completed) {
                job.progress_percent = 100.0;
            }
        })
    }

    /// Snapshot every job currently tracked, for the sweeper and for
    /// listing endpoints.
    pub fn all(&self) -> Snapshot {
        self.snapshot.load_full()
    }

    /// Remove a job outright (used by the retention sweeper).
    pub fn remove(&self, scan_id: ScanId) {
        let _guard = self.write_lock.lock();
        let current = self.snapshot.load();
        if !current.contains_key(&scan_id) {
            return;
        }
        let mut next: HashMap<ScanId, Arc<ScanJob>> = (**current).clone();
        next.remove(&scan_id);
        self.snapshot.store(Arc::new(next));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ReportFormat, ScanRequest};

    fn sample_request() -> ScanRequest {
        ScanRequest {
            repository_url: "https://example.com/repo.git".to_string(),
            branch: None,
            credential: None,
            threshold: 70.0,
            report_format: ReportFormat::Both,
            scan_timeout_secs: 900,
        }
    }

    #[test]
    fn insert_and_get_round_trips() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));
        let job = registry.get(id).expect("job should be present");
        assert_eq!(job.state, JobState::Pending);
    }

    #[test]
    fn update_bumps_updated_at_and_mutates_fields() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));
        let before = registry.get(id).unwrap().updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.advance(id, 50.0, "validate", "7/10 gates").unwrap();

        let after = registry.get(id).unwrap();
        assert!(after.updated_at >= before);
        assert_eq!(after.progress_percent, 50.0);
        assert_eq!(after.current_step, "validate");
    }

    #[test]
    fn progress_never_decreases() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));
        registry.advance(id, 80.0, "validate", "").unwrap();
        registry.advance(id, 10.0, "validate", "").unwrap();
        assert_eq!(registry.get(id).unwrap().progress_percent, 80.0);
    }

    #[test]
    fn finish_sets_completed_at() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));
        registry.finish(id, JobState::Completed, false).unwrap();
        let job = registry.get(id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn update_on_unknown_scan_id_errors() {
        let registry = JobRegistry::new();
        let result = registry.update(ScanId::new_v4(), |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn remove_drops_the_job() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));
        registry.remove(id);
        assert!(registry.get(id).is_none());
    }
}
