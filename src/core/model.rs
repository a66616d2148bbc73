//! Core data model shared by the pipeline, pattern engine, and storage layer.
//!
//! These types mirror §3 of the specification verbatim, plus the fields
//! the original Python prototype (`codegates/storage/models.py`) carried
//! that the distilled spec folded into prose: `report_format` and
//! `workspace_path` on [`ScanJob`], `category`/`priority` on [`GateResult`].

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque scan identifier. Never reused within a process lifetime.
pub type ScanId = Uuid;

/// Desired output format for a scan's report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Self-contained HTML report.
    Html,
    /// Machine-readable JSON mirroring [`ScanResult`].
    Json,
    /// Both HTML and JSON are generated.
    Both,
    /// PDF is an external collaborator (§1 Non-goals); requesting it is
    /// accepted but report generation returns `FeatureUnavailable`.
    Pdf,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self::Both
    }
}

/// Inbound request to start a scan (`POST /api/v1/scan`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Repository URL to clone.
    pub repository_url: String,
    /// Branch to check out. Defaults to the repository's default branch.
    #[serde(default)]
    pub branch: Option<String>,
    /// Optional credential (token, ssh key reference) for private repos.
    #[serde(default, skip_serializing)]
    pub credential: Option<String>,
    /// Compliance threshold in [0, 100]. Defaults to 70.
    #[serde(default = "ScanRequest::default_threshold")]
    pub threshold: f64,
    /// Desired report format.
    #[serde(default)]
    pub report_format: ReportFormat,
    /// Hard wall-clock deadline for the whole scan, in seconds.
    #[serde(default = "ScanRequest::default_timeout_secs")]
    pub scan_timeout_secs: u64,
}

impl ScanRequest {
    /// Default compliance threshold used when a request omits one.
    pub const fn default_threshold() -> f64 {
        70.0
    }

    /// Default scan deadline: 15 minutes, per §5.
    pub const fn default_timeout_secs() -> u64 {
        15 * 60
    }

    /// Synchronous validation applied before a job is created.
    pub fn validate(&self) -> crate::core::errors::Result<()> {
        use crate::core::errors::HardGatesError;

        if self.repository_url.trim().is_empty() {
            return Err(HardGatesError::invalid_request(
                "repository_url must not be empty",
            ));
        }
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(HardGatesError::invalid_request(
                "threshold must be within [0, 100]",
            ));
        }
        if self.scan_timeout_secs == 0 {
            return Err(HardGatesError::invalid_request(
                "scan_timeout_secs must be positive",
            ));
        }
        Ok(())
    }
}

/// Lifecycle state of a [`ScanJob`]. Transitions form a DAG: `Pending` ->
/// `Running` -> one of the terminal states. No resurrection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted, not yet picked up by a pipeline worker.
    Pending,
    /// A pipeline is actively driving this job through its stages.
    Running,
    /// All stages ran to completion (possibly with `incomplete = true`).
    Completed,
    /// A fatal error terminated the job before completion.
    Failed,
    /// The job was cancelled cooperatively.
    Cancelled,
}

impl JobState {
    /// Terminal states are immutable once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A single captured error surfaced to the job's error list without failing the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    /// Pipeline stage that recorded the error.
    pub stage: String,
    /// Human-readable message.
    pub message: String,
    /// When the error was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// Point-in-time, immutable snapshot of a scan job's state.
///
/// Snapshots are value objects returned by copy from the job registry; the
/// owning pipeline is the only writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    /// Opaque scan identifier.
    pub scan_id: ScanId,
    /// Current lifecycle state.
    pub state: JobState,
    /// Progress percentage, monotonic non-decreasing within a job.
    pub progress_percent: f64,
    /// Name of the stage currently executing (or last executed).
    pub current_step: String,
    /// Free-text detail for the current step (e.g. "142/900 files").
    pub step_detail: String,
    /// Compliance threshold echoed from the originating request.
    pub threshold: f64,
    /// Report format echoed from the originating request.
    pub report_format: ReportFormat,
    /// Absolute path to the working tree, once materialized.
    pub workspace_path: Option<PathBuf>,
    /// Errors captured so far; never empties a completed job's history.
    pub errors: Vec<JobError>,
    /// True once a deadline forced early termination with partial results.
    pub incomplete: bool,
    /// Time the request was accepted.
    pub created_at: DateTime<Utc>,
    /// Time of the most recent mutation.
    pub updated_at: DateTime<Utc>,
    /// Time the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanJob {
    /// Construct a freshly-accepted job in the `Pending` state.
    pub fn new(scan_id: ScanId, request: &ScanRequest) -> Self {
        let now = Utc::now();
        Self {
            scan_id,
            state: JobState::Pending,
            progress_percent: 0.0,
            current_step: "pending".to_string(),
            step_detail: String::new(),
            threshold: request.threshold,
            report_format: request.report_format,
            workspace_path: None,
            errors: Vec::new(),
            incomplete: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// Per-language file/line counts, keyed by language name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageStats {
    /// Number of files classified as this language.
    pub files: usize,
    /// Total line count across those files.
    pub lines: usize,
}

/// Technology categories used by the applicability analyzer (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedCategories {
    /// Client-side / browser-facing technology present.
    pub frontend: bool,
    /// Server-side technology present.
    pub backend: bool,
    /// HTTP/RPC API surface detected (framework config or route decorators).
    pub api: bool,
    /// Mobile application technology present.
    pub mobile: bool,
}

/// Immutable snapshot of repository-level facts, built during inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMetadata {
    /// Absolute path to the working tree.
    pub working_tree_path: PathBuf,
    /// Total number of files kept after inventory filtering.
    pub file_count: usize,
    /// Total line count across kept files.
    pub total_lines: usize,
    /// Per-language statistics.
    pub language_stats: HashMap<String, LanguageStats>,
    /// Build tools detected (e.g. "cargo", "maven", "npm").
    pub build_tools: Vec<String>,
    /// Frameworks detected (e.g. "spring", "express", "django").
    pub frameworks: Vec<String>,
    /// Deployment platforms detected (e.g. "kubernetes", "docker", "lambda").
    pub deployment_platforms: Vec<String>,
    /// Resolved git commit hash, if the working tree is a git checkout.
    pub commit_hash: Option<String>,
    /// Timestamp of the last commit, if available.
    pub last_commit_date: Option<DateTime<Utc>>,
    /// Languages whose file share crosses the primary/secondary thresholds (§4.2).
    pub primary_technologies: Vec<String>,
    /// Derived technology categories, computed once and reused by every gate.
    pub detected_categories: DetectedCategories,
}

/// Role a [`FileEntry`] plays within the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    /// Non-test application source.
    SourceCode,
    /// Test code, identified by path markers.
    TestCode,
    /// Build or dependency configuration.
    Config,
    /// Documentation.
    Doc,
    /// Build tool output or scripts.
    Build,
    /// Anything not classified above.
    Other,
}

/// One file kept by the inventory walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the working tree root.
    pub path: PathBuf,
    /// Classified language, or `None` if unrecognized.
    pub language: Option<String>,
    /// Classified role.
    pub role: FileRole,
    /// Size in bytes.
    pub size: u64,
    /// Line count.
    pub line_count: usize,
    /// Whether the file was judged binary (and thus unscannable).
    pub is_binary: bool,
}

/// Single regex match recorded against a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// Path relative to the working tree.
    pub file_path: PathBuf,
    /// 1-based line number.
    pub line_number: usize,
    /// Original pattern source text that produced this match.
    pub pattern: String,
    /// The matched substring.
    pub matched_text: String,
    /// Which collector produced this match (`"static"`, a collector name, ...).
    pub source: String,
    /// The full line containing the match, for display, bounded in length.
    pub context_line: String,
}

/// Status classification of a single gate's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateStatus {
    /// Score met or exceeded the pass threshold.
    Pass,
    /// Score is below pass but above the warning threshold.
    Warning,
    /// Score is below the warning threshold.
    Fail,
    /// The gate does not apply to this repository's technology mix.
    NotApplicable,
}

/// Counts accompanying a gate's evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateCounts {
    /// Number of patterns used for this gate in this scan.
    pub patterns_used: usize,
    /// Total matches found across all files.
    pub matches_found: usize,
    /// Number of files to which this gate's patterns applied.
    pub relevant_files: usize,
    /// Number of those files that had at least one match.
    pub files_with_matches: usize,
}

/// Confidence tag attached to an evidence collector's contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Lowest confidence; sorts first so `min()` picks it over higher tiers.
    Low,
    /// Medium confidence.
    Medium,
    /// Highest confidence.
    High,
}

/// Record of one evidence collector's contribution to a gate's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSource {
    /// Collector name (`"static"`, `"external_integration"`, `"llm_patterns"`, ...).
    pub collector: String,
    /// Whether the collector was enabled for this scan.
    pub enabled: bool,
    /// Whether the collector succeeded.
    pub succeeded: bool,
    /// Failure cause, if `succeeded` is false.
    pub failure_cause: Option<String>,
    /// Confidence tag for this contribution.
    pub confidence: Confidence,
}

/// Fully evaluated result for a single gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    /// Stable gate name (e.g. `"STRUCTURED_LOGS"`).
    pub gate_name: String,
    /// Display name from the catalog.
    pub display_name: String,
    /// Category copied from the gate definition.
    pub category: String,
    /// Priority copied from the gate definition.
    pub priority: String,
    /// Final classification.
    pub status: GateStatus,
    /// Final score in [0, 100].
    pub score: f64,
    /// Weight used when folding this gate into the overall score.
    pub weight: f64,
    /// Matches kept for the report (capped).
    pub matches: Vec<Match>,
    /// Aggregate counts.
    pub counts: GateCounts,
    /// Collectors that contributed to this result.
    pub validation_sources: Vec<ValidationSource>,
    /// Formatted recommendation text.
    pub recommendation: String,
    /// Reason a `NotApplicable` gate was skipped; empty otherwise.
    pub not_applicable_reason: String,
    /// True if this gate's scan was cut short by a deadline.
    pub partial: bool,
}

/// Full result of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Opaque scan identifier.
    pub scan_id: ScanId,
    /// Weight-normalized mean of applicable gates' scores.
    pub overall_score: f64,
    /// Results for gates that applied to this repository.
    pub applicable_gates: Vec<GateResult>,
    /// Gates skipped with their human-readable reason.
    pub non_applicable_gates: Vec<GateResult>,
    /// Repository metadata snapshot.
    pub metadata: RepoMetadata,
    /// Errors captured during the scan.
    pub errors: Vec<JobError>,
    /// True if a deadline forced early termination.
    pub incomplete: bool,
    /// Time the scan was created.
    pub created_at: DateTime<Utc>,
    /// Time of the most recent update.
    pub updated_at: DateTime<Utc>,
    /// Time the scan completed, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanResult {
    /// Status implied by comparing `overall_score` against a threshold,
    /// used by the CLI exit-code contract (§6).
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.overall_score >= threshold
    }
}
