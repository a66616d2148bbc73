//! Pipeline stages (§4.8): FetchRepository, InventoryRepository,
//! ExtractBuildMetadata, ValidateGates, GenerateReport, Cleanup.
//!
//! Each stage reads and mutates a shared [`Workspace`] and reports its own
//! progress through a callback rather than writing to the job registry
//! directly, keeping stages ignorant of how (or whether) progress is
//! published.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::core::config::HardGatesConfig;
use crate::core::errors::Result;
use crate::core::model::{GateResult, JobError, ScanId, ScanRequest};
use crate::core::pipeline::context::StopSignal;
use crate::fetch;
use crate::gates::GateEngine;
use crate::inventory::{self, Inventory};
use crate::report;

/// Mutable state threaded through every stage of one scan.
pub struct Workspace {
    pub scan_id: ScanId,
    pub request: ScanRequest,
    pub working_tree: Option<PathBuf>,
    pub inventory: Option<Inventory>,
    pub applicable_gates: Vec<GateResult>,
    pub non_applicable_gates: Vec<GateResult>,
    pub errors: Vec<JobError>,
    pub incomplete: bool,
    pub report_paths: report::ReportPaths,
}

impl Workspace {
    pub fn new(scan_id: ScanId, request: ScanRequest) -> Self {
        Self {
            scan_id,
            request,
            working_tree: None,
            inventory: None,
            applicable_gates: Vec::new(),
            non_applicable_gates: Vec::new(),
            errors: Vec::new(),
            incomplete: false,
            report_paths: report::ReportPaths::default(),
        }
    }

    fn record_error(&mut self, stage: &str, message: impl Into<String>) {
        self.errors.push(JobError {
            stage: stage.to_string(),
            message: message.into(),
            occurred_at: chrono::Utc::now(),
        });
    }
}

/// Reports incremental progress within a stage (e.g. files-processed /
/// total-files during `ValidateGates`). Stages that don't have meaningful
/// sub-progress simply never call it.
pub type ProgressCallback<'a> = dyn Fn(f64, &str) + 'a;

/// One named, weighted step of the pipeline.
pub trait Stage: Send + Sync {
    /// Stable identifier surfaced as `ScanJob::current_step`.
    fn name(&self) -> &'static str;

    /// Share of the overall progress bar this stage accounts for, in [0, 100].
    fn weight(&self) -> f64;

    /// Execute the stage. A recoverable failure should be recorded onto
    /// `workspace.errors` and return `Ok(())`; only a fatal condition (no
    /// working tree, catastrophic catalog failure) should return `Err`.
    fn run(
        &self,
        workspace: &mut Workspace,
        config: &HardGatesConfig,
        stop: &StopSignal,
        progress: &ProgressCallback<'_>,
    ) -> Result<()>;
}

/// Clones or resolves the repository into a local working tree.
pub struct FetchRepository;

impl Stage for FetchRepository {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn weight(&self) -> f64 {
        15.0
    }

    #[instrument(skip_all, fields(scan_id = %workspace.scan_id))]
    fn run(
        &self,
        workspace: &mut Workspace,
        _config: &HardGatesConfig,
        stop: &StopSignal,
        progress: &ProgressCallback<'_>,
    ) -> Result<()> {
        progress(0.0, "cloning repository");
        let dest = fetch::workspace_dir(workspace.scan_id)?;
        let working_tree = fetch::fetch_repository(&workspace.request, &dest, stop)?;
        info!(path = %working_tree.display(), "repository materialized");
        workspace.working_tree = Some(working_tree);
        progress(100.0, "repository ready");
        Ok(())
    }
}

/// Walks the working tree and classifies every kept file.
pub struct InventoryRepository;

impl Stage for InventoryRepository {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn weight(&self) -> f64 {
        10.0
    }

    #[instrument(skip_all, fields(scan_id = %workspace.scan_id))]
    fn run(
        &self,
        workspace: &mut Workspace,
        config: &HardGatesConfig,
        stop: &StopSignal,
        progress: &ProgressCallback<'_>,
    ) -> Result<()> {
        let root = workspace
            .working_tree
            .clone()
            .ok_or_else(|| crate::core::errors::HardGatesError::internal("fetch stage did not produce a working tree"))?;

        progress(0.0, "walking files");
        let inventory = inventory::build_inventory(
            &root,
            config.performance.max_files_per_scan,
            &config.technology_detection,
        )?;
        stop.deadline.check("inventory")?;

        info!(
            file_count = inventory.metadata.file_count,
            "inventory complete"
        );
        workspace.inventory = Some(inventory);
        progress(100.0, "inventory complete");
        Ok(())
    }
}

/// Surfaces the build/framework/deployment facts the inventory walk already
/// derived. Kept as its own stage (rather than folded into inventory) so
/// progress and partial-failure reporting line up with §4.8's stage list;
/// the heavy lifting lives in [`inventory::build_inventory`].
pub struct ExtractBuildMetadata;

impl Stage for ExtractBuildMetadata {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn weight(&self) -> f64 {
        5.0
    }

    #[instrument(skip_all, fields(scan_id = %workspace.scan_id))]
    fn run(
        &self,
        workspace: &mut Workspace,
        _config: &HardGatesConfig,
        _stop: &StopSignal,
        progress: &ProgressCallback<'_>,
    ) -> Result<()> {
        progress(0.0, "extracting build metadata");
        let Some(inventory) = &workspace.inventory else {
            workspace.record_error(self.name(), "no inventory available to extract metadata from");
            return Ok(());
        };

        info!(
            build_tools = ?inventory.metadata.build_tools,
            frameworks = ?inventory.metadata.frameworks,
            deployment_platforms = ?inventory.metadata.deployment_platforms,
            primary_technologies = ?inventory.metadata.primary_technologies,
            "build metadata extracted"
        );
        progress(100.0, "build metadata extracted");
        Ok(())
    }
}

/// Runs every catalog gate's applicability check and (for applicable gates)
/// the shared file scan, scoring, and collector pipeline.
pub struct ValidateGates {
    pub engine: Arc<GateEngine>,
}

impl Stage for ValidateGates {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn weight(&self) -> f64 {
        55.0
    }

    #[instrument(skip_all, fields(scan_id = %workspace.scan_id))]
    fn run(
        &self,
        workspace: &mut Workspace,
        config: &HardGatesConfig,
        stop: &StopSignal,
        progress: &ProgressCallback<'_>,
    ) -> Result<()> {
        let root = workspace
            .working_tree
            .clone()
            .ok_or_else(|| crate::core::errors::HardGatesError::internal("validate stage ran with no working tree"))?;
        let Some(inventory) = workspace.inventory.clone() else {
            workspace.record_error(self.name(), "no inventory available to validate gates against");
            return Ok(());
        };

        let total_files = inventory.metadata.file_count.max(1) as f64;
        progress(0.0, &format!("0/{} files", inventory.metadata.file_count));

        let (applicable, non_applicable) = self.engine.evaluate_all(&root, &inventory, config, stop)?;

        let processed = inventory
            .files
            .iter()
            .filter(|f| !f.is_binary && f.language.is_some())
            .count() as f64;
        progress(
            (processed / total_files * 100.0).min(100.0),
            &format!("{}/{} files", processed as usize, inventory.metadata.file_count),
        );

        if stop.should_stop() {
            workspace.incomplete = true;
            workspace.record_error(self.name(), "scan deadline reached before all gates finished");
        }

        workspace.applicable_gates = applicable;
        workspace.non_applicable_gates = non_applicable;
        Ok(())
    }
}

/// Persists the fully-populated [`crate::core::model::ScanResult`] and
/// renders the requested report formats. Rendering is an external
/// collaborator by design (§7 REDESIGN FLAGS): this stage only calls into
/// [`crate::report`], never duplicates its logic.
pub struct GenerateReport;

impl Stage for GenerateReport {
    fn name(&self) -> &'static str {
        "report"
    }

    fn weight(&self) -> f64 {
        10.0
    }

    #[instrument(skip_all, fields(scan_id = %workspace.scan_id))]
    fn run(
        &self,
        workspace: &mut Workspace,
        config: &HardGatesConfig,
        _stop: &StopSignal,
        progress: &ProgressCallback<'_>,
    ) -> Result<()> {
        progress(0.0, "rendering report");
        let Some(inventory) = &workspace.inventory else {
            workspace.record_error(self.name(), "no inventory available to report against");
            return Ok(());
        };

        let result = report::build_scan_result(workspace, inventory);
        match report::render(&result, workspace.request.report_format, config) {
            Ok(paths) => workspace.report_paths = paths,
            Err(e) => {
                warn!(error = %e, "report rendering failed");
                workspace.record_error(self.name(), e.to_string());
            }
        }
        progress(100.0, "report ready");
        Ok(())
    }
}

/// Removes the working tree. Always runs, even on failure or cancellation.
pub struct Cleanup;

impl Stage for Cleanup {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn weight(&self) -> f64 {
        5.0
    }

    #[instrument(skip_all, fields(scan_id = %workspace.scan_id))]
    fn run(
        &self,
        workspace: &mut Workspace,
        _config: &HardGatesConfig,
        _stop: &StopSignal,
        progress: &ProgressCallback<'_>,
    ) -> Result<()> {
        progress(0.0, "cleaning up workspace");
        if let Err(e) = fetch::cleanup_workspace(workspace.scan_id) {
            warn!(error = %e, "failed to remove scan workspace");
        }
        progress(100.0, "done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ReportFormat;
    use crate::patterns::cache::PatternCache;
    use crate::patterns::PatternLibrary;
    use std::fs;
    use std::time::Duration;

    fn sample_request(url: &str) -> ScanRequest {
        ScanRequest {
            repository_url: url.to_string(),
            branch: None,
            credential: None,
            threshold: 70.0,
            report_format: ReportFormat::Json,
            scan_timeout_secs: 900,
        }
    }

    fn noop_progress(_percent: f64, _detail: &str) {}

    #[test]
    fn fetch_stage_resolves_a_local_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.py"), "print('hi')\n").unwrap();

        let mut workspace = Workspace::new(ScanId::new_v4(), sample_request(dir.path().to_str().unwrap()));
        let config = HardGatesConfig::default();
        let stop = StopSignal::new(crate::core::pipeline::context::Deadline::after(Duration::from_secs(60)));

        FetchRepository.run(&mut workspace, &config, &stop, &noop_progress).unwrap();
        assert_eq!(workspace.working_tree, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn inventory_stage_requires_a_working_tree() {
        let mut workspace = Workspace::new(ScanId::new_v4(), sample_request("/nonexistent"));
        let config = HardGatesConfig::default();
        let stop = StopSignal::new(crate::core::pipeline::context::Deadline::after(Duration::from_secs(60)));

        let err = InventoryRepository.run(&mut workspace, &config, &stop, &noop_progress);
        assert!(err.is_err());
    }

    #[test]
    fn validate_stage_populates_gate_results() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("app.py"),
            "import logging\nlogger = logging.getLogger(__name__)\nlogger.info('started')\n",
        )
        .unwrap();

        let mut workspace = Workspace::new(ScanId::new_v4(), sample_request(dir.path().to_str().unwrap()));
        let config = HardGatesConfig::default();
        let stop = StopSignal::new(crate::core::pipeline::context::Deadline::after(Duration::from_secs(60)));

        FetchRepository.run(&mut workspace, &config, &stop, &noop_progress).unwrap();
        InventoryRepository.run(&mut workspace, &config, &stop, &noop_progress).unwrap();

        let cache = Arc::new(PatternCache::new(Default::default()));
        let library = Arc::new(PatternLibrary::load_default(cache).unwrap());
        let engine = Arc::new(GateEngine::new(library));
        let validate = ValidateGates { engine };
        validate.run(&mut workspace, &config, &stop, &noop_progress).unwrap();

        assert!(!workspace.applicable_gates.is_empty());
    }

    #[test]
    fn cleanup_removes_the_workspace_directory_even_if_nothing_ran() {
        let scan_id = ScanId::new_v4();
        let dir = fetch::workspace_dir(scan_id).unwrap();
        let mut workspace = Workspace::new(scan_id, sample_request("/nonexistent"));
        let config = HardGatesConfig::default();
        let stop = StopSignal::new(crate::core::pipeline::context::Deadline::after(Duration::from_secs(60)));

        Cleanup.run(&mut workspace, &config, &stop, &noop_progress).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn stage_weights_sum_to_one_hundred() {
        let weights = [
            FetchRepository.weight(),
            InventoryRepository.weight(),
            ExtractBuildMetadata.weight(),
            ValidateGates {
                engine: Arc::new(GateEngine::new(Arc::new(
                    PatternLibrary::load_default(Arc::new(PatternCache::new(Default::default()))).unwrap(),
                ))),
            }
            .weight(),
            GenerateReport.weight(),
            Cleanup.weight(),
        ];
        let total: f64 = weights.iter().sum();
        assert!((total - 100.0).abs() < f64::EPSILON);
    }
}
