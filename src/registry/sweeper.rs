//! Background retention sweeper for the job registry (§4.9).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::registry::JobRegistry;

/// How often the sweeper checks for expired terminal jobs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default retention window for terminal jobs: 24 hours.
pub const DEFAULT_RETENTION: chrono::Duration = chrono::Duration::hours(24);

/// Run the retention sweeper until the process shuts down: every
/// [`SWEEP_INTERVAL`], remove terminal jobs whose `completed_at` is older
/// than `retention`.
pub async fn run(registry: Arc<JobRegistry>, retention: chrono::Duration) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let removed = sweep_once(&registry, retention);
        if removed > 0 {
            info!(removed, "retention sweeper removed expired jobs");
        }
    }
}

/// Perform one sweep pass, returning the number of jobs removed. Exposed
/// separately from [`run`] so it can be driven deterministically in tests.
pub fn sweep_once(registry: &JobRegistry, retention: chrono::Duration) -> usize {
    let now = Utc::now();
    let mut removed = 0usize;
    for (scan_id, job) in registry.all().iter() {
        let Some(completed_at) = job.completed_at else {
            continue;
        };
        if now - completed_at >= retention {
            registry.remove(*scan_id);
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{JobState, ReportFormat, ScanId, ScanJob, ScanRequest};

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
    fn sweeps_jobs_completed_before_the_retention_window() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));
        registry.finish(id, JobState::Completed, false).unwrap();
        registry
            .update(id, |job| {
                job.completed_at = Some(Utc::now() - chrono::Duration::hours(48));
            })
            .unwrap();

        let removed = sweep_once(&registry, DEFAULT_RETENTION);
        assert_eq!(removed, 1);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn keeps_recently_completed_jobs() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));
        registry.finish(id, JobState::Completed, false).unwrap();

        let removed = sweep_once(&registry, DEFAULT_RETENTION);
        assert_eq!(removed, 0);
        assert!(registry.get(id).is_some());
    }

    #[test]
    fn never_sweeps_non_terminal_jobs() {
        let registry = JobRegistry::new();
        let id = ScanId::new_v4();
        registry.insert(ScanJob::new(id, &sample_request()));

        let removed = sweep_once(&registry, chrono::Duration::seconds(0));
        assert_eq!(removed, 0);
    }
}
