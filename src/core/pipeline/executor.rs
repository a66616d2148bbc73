//! Pipeline executor: drives the fixed stage list over one scan, publishing
//! stage-weighted progress to the job registry and guaranteeing `Cleanup`
//! runs under every outcome (§4.8, §5).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::core::config::HardGatesConfig;
use crate::core::errors::Result;
use crate::core::model::{JobState, ScanId, ScanRequest};
use crate::core::pipeline::context::{Deadline, StopSignal};
use crate::core::pipeline::stages::{
    Cleanup, ExtractBuildMetadata, FetchRepository, GenerateReport, InventoryRepository, Stage,
    ValidateGates, Workspace,
};
use crate::gates::GateEngine;
use crate::registry::JobRegistry;
use crate::report;
use crate::store::ResultStore;

/// Orchestrates one scan from `Pending` to a terminal [`JobState`].
///
/// One `Pipeline` is constructed per process and shared (via `Arc`) across
/// however many scans run concurrently; it carries no per-scan state of its
/// own, only the shared engine, registry, and store. Admission is gated by
/// a global semaphore sized from `performance.max_concurrent_scans` (§5): a
/// job stays `Pending` until a permit is free, then runs to completion.
pub struct Pipeline {
    engine: Arc<GateEngine>,
    registry: Arc<JobRegistry>,
    store: Arc<dyn ResultStore>,
    admission: Arc<Semaphore>,
}

impl Pipeline {
    /// Build a pipeline over the shared gate engine, job registry, and
    /// result store that live for the process's lifetime, admitting at
    /// most `max_concurrent_scans` scans into `Running` at once.
    pub fn new(
        engine: Arc<GateEngine>,
        registry: Arc<JobRegistry>,
        store: Arc<dyn ResultStore>,
        max_concurrent_scans: usize,
    ) -> Self {
        Self {
            engine,
            registry,
            store,
            admission: Arc::new(Semaphore::new(max_concurrent_scans.max(1))),
        }
    }

    /// Run every stage for `scan_id`, publishing progress through the job
    /// registry and persisting the final [`crate::core::model::ScanResult`]
    /// on completion. Cancellation and the request's own deadline are both
    /// cooperative: the current stage finishes its unit of work, then the
    /// remaining stages (except `Cleanup`, which always runs) are skipped.
    #[instrument(skip(self, request), fields(scan_id = %scan_id))]
    pub async fn run(&self, scan_id: ScanId, request: ScanRequest, config: Arc<HardGatesConfig>) {
        let _permit = match self.admission.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.registry
                    .record_error(scan_id, "pipeline", "admission semaphore closed")
                    .ok();
                self.registry.finish(scan_id, JobState::Failed, true).ok();
                return;
            }
        };

        self.registry.update(scan_id, |job| job.state = JobState::Running).ok();

        let stop = StopSignal::new(Deadline::after(Duration::from_secs(request.scan_timeout_secs)));
        let mut workspace = Workspace::new(scan_id, request);

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(FetchRepository),
            Box::new(InventoryRepository),
            Box::new(ExtractBuildMetadata),
            Box::new(ValidateGates {
                engine: Arc::clone(&self.engine),
            }),
            Box::new(GenerateReport),
        ];

        let mut base_percent = 0.0;
        let mut fatal: Option<String> = None;

        for stage in &stages {
            if stop.cancel.is_cancelled() {
                info!(stage = stage.name(), "cancellation observed, skipping remaining stages");
                break;
            }

            let weight = stage.weight();
            let name = stage.name();
            let registry = Arc::clone(&self.registry);
            let base = base_percent;

            let progress = move |within_stage: f64, detail: &str| {
                let percent = base + within_stage / 100.0 * weight;
                registry.advance(scan_id, percent, name, detail).ok();
            };

            match stage.run(&mut workspace, &config, &stop, &progress) {
                Ok(()) => {}
                Err(e) => {
                    error!(stage = name, error = %e, "fatal pipeline stage failure");
                    fatal = Some(format!("{name}: {e}"));
                    break;
                }
            }

            base_percent += weight;
        }

        // Cleanup always runs, success, failure, or cancellation alike.
        let cleanup_registry = Arc::clone(&self.registry);
        let cleanup_progress = move |within_stage: f64, detail: &str| {
            let percent = base_percent + within_stage / 100.0 * Cleanup.weight();
            cleanup_registry.advance(scan_id, percent.min(100.0), Cleanup.name(), detail).ok();
        };
        if let Err(e) = Cleanup.run(&mut workspace, &config, &stop, &cleanup_progress) {
            warn!(error = %e, "cleanup stage reported an error");
        }

        if let Some(message) = fatal {
            self.registry.record_error(scan_id, "pipeline", &message).ok();
            self.registry.finish(scan_id, JobState::Failed, true).ok();
            return;
        }

        if stop.cancel.is_cancelled() {
            self.registry.finish(scan_id, JobState::Cancelled, true).ok();
            return;
        }

        let result = match &workspace.inventory {
            Some(inventory) => report::build_scan_result(&workspace, inventory),
            None => {
                self.registry
                    .record_error(scan_id, "pipeline", "scan ended with no inventory to report")
                    .ok();
                self.registry.finish(scan_id, JobState::Failed, true).ok();
                return;
            }
        };

        if let Err(e) = self.store.save(&result).await {
            error!(error = %e, "failed to persist scan result");
            self.registry.record_error(scan_id, "store", e.to_string()).ok();
        }

        self.registry.finish(scan_id, JobState::Completed, workspace.incomplete).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ReportFormat;
    use crate::patterns::cache::PatternCache;
    use crate::patterns::PatternLibrary;
    use crate::store::memory::InMemoryStore;
    use std::fs;

    fn sample_request(url: &str) -> ScanRequest {
        ScanRequest {
            repository_url: url.to_string(),
            branch: None,
            credential: None,
            threshold: 70.0,
            report_format: ReportFormat::Json,
            scan_timeout_secs: 60,
        }
    }

    fn build_pipeline(registry: Arc<JobRegistry>, store: Arc<dyn ResultStore>) -> Pipeline {
        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = Arc::new(PatternLibrary::load_default(cache).unwrap());
        let engine = Arc::new(GateEngine::new(library));
        Pipeline::new(engine, registry, store, 4)
    }

    #[tokio::test]
    async fn successful_scan_completes_and_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("app.py"),
            "import logging\nlogger = logging.getLogger(__name__)\nlogger.info('started')\n",
        )
        .unwrap();

        let registry = Arc::new(JobRegistry::new());
        let store: Arc<dyn ResultStore> = Arc::new(InMemoryStore::new());
        let pipeline = build_pipeline(Arc::clone(&registry), Arc::clone(&store));

        let request = sample_request(dir.path().to_str().unwrap());
        let scan_id = ScanId::new_v4();
        registry.insert(crate::core::model::ScanJob::new(scan_id, &request));

        pipeline.run(scan_id, request, Arc::new(HardGatesConfig::default())).await;

        let job = registry.get(scan_id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress_percent, 100.0);

        let stored = store.get(scan_id).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn fetch_failure_marks_the_job_failed() {
        let registry = Arc::new(JobRegistry::new());
        let store: Arc<dyn ResultStore> = Arc::new(InMemoryStore::new());
        let pipeline = build_pipeline(Arc::clone(&registry), Arc::clone(&store));

        let request = sample_request("https://example.invalid/missing-repo.git");
        let scan_id = ScanId::new_v4();
        registry.insert(crate::core::model::ScanJob::new(scan_id, &request));

        pipeline.run(scan_id, request, Arc::new(HardGatesConfig::default())).await;

        let job = registry.get(scan_id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(!job.errors.is_empty());
    }

    #[tokio::test]
    async fn admission_is_bounded_by_max_concurrent_scans() {
        let registry = Arc::new(JobRegistry::new());
        let store: Arc<dyn ResultStore> = Arc::new(InMemoryStore::new());
        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = Arc::new(PatternLibrary::load_default(cache).unwrap());
        let engine = Arc::new(GateEngine::new(library));
        let pipeline = Pipeline::new(engine, registry, store, 1);

        let first_permit = pipeline.admission.clone().acquire_owned().await.unwrap();
        assert_eq!(pipeline.admission.available_permits(), 0);

        assert!(
            pipeline.admission.clone().try_acquire_owned().is_err(),
            "a second scan should not be admitted while the only permit is held"
        );

        drop(first_permit);
        assert!(pipeline.admission.clone().try_acquire_owned().is_ok());
    }
}
