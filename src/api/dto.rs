//! Wire types for the HTTP API (§6).
//!
//! [`ScanStatusResponse`] carries both the current field names and the
//! backward-compatible aliases spec.md §6 calls out explicitly (`score`,
//! `progress`, `gates`) so older clients of the original service keep
//! working unmodified.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::model::{JobError, JobState, ReportFormat, ScanId};

/// `POST /api/v1/scan` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct StartScanRequest {
    pub repository_url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub report_format: Option<ReportFormat>,
    #[serde(default)]
    pub scan_timeout_secs: Option<u64>,
}

impl StartScanRequest {
    pub fn into_scan_request(self) -> crate::core::model::ScanRequest {
        let defaults = crate::core::model::ScanRequest {
            repository_url: self.repository_url,
            branch: self.branch,
            credential: self.credential,
            threshold: self
                .threshold
                .unwrap_or_else(crate::core::model::ScanRequest::default_threshold),
            report_format: self.report_format.unwrap_or_default(),
            scan_timeout_secs: self
                .scan_timeout_secs
                .unwrap_or_else(crate::core::model::ScanRequest::default_timeout_secs),
        };
        defaults
    }
}

/// `POST /api/v1/scan` response body.
#[derive(Debug, Clone, Serialize)]
pub struct StartScanResponse {
    pub scan_id: ScanId,
    pub status: &'static str,
    pub message: &'static str,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// `GET /api/v1/scan/{scan_id}` response body.
///
/// `score`, `progress`, and `gates` are aliases mirrored onto the same
/// values as `overall_score`, `progress_percent`, and `gate_results` for
/// clients still speaking the pre-rewrite contract.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatusResponse {
    pub scan_id: ScanId,
    pub status: JobState,
    pub overall_score: f64,
    pub score: f64,
    pub progress_percent: f64,
    pub progress: f64,
    pub current_step: String,
    pub step_details: String,
    pub gate_results: Option<GateResultsSummary>,
    pub gates: Option<GateResultsSummary>,
    pub errors: Vec<JobError>,
    pub incomplete: bool,
    pub html_report_url: Option<String>,
    pub json_report_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Gate counts surfaced once a scan has a stored [`crate::core::model::ScanResult`].
#[derive(Debug, Clone, Serialize)]
pub struct GateResultsSummary {
    pub total: usize,
    pub passed: usize,
    pub warning: usize,
    pub failed: usize,
    pub not_applicable: usize,
}

impl GateResultsSummary {
    pub fn from_result(result: &crate::core::model::ScanResult) -> Self {
        use crate::core::model::GateStatus;

        let mut summary = Self {
            total: result.applicable_gates.len() + result.non_applicable_gates.len(),
            passed: 0,
            warning: 0,
            failed: 0,
            not_applicable: result.non_applicable_gates.len(),
        };
        for gate in &result.applicable_gates {
            match gate.status {
                GateStatus::Pass => summary.passed += 1,
                GateStatus::Warning => summary.warning += 1,
                GateStatus::Fail => summary.failed += 1,
                GateStatus::NotApplicable => summary.not_applicable += 1,
            }
        }
        summary
    }
}

/// `GET /api/v1/scan/{scan_id}/report/{html|json}` response when the report
/// has not finished rendering yet.
#[derive(Debug, Clone, Serialize)]
pub struct ReportNotReady {
    pub message: &'static str,
}

impl Default for ReportNotReady {
    fn default() -> Self {
        Self {
            message: "report is still being generated",
        }
    }
}

/// `GET /api/v1/gates` entry.
#[derive(Debug, Clone, Serialize)]
pub struct GateInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub weight: f64,
}

/// `GET /api/v1/health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store_healthy: bool,
    pub active_scans: usize,
}

/// Report artifact path pair stored per scan, keyed off the reports
/// directory the [`crate::report`] module writes into.
#[derive(Debug, Clone, Default)]
pub struct ReportLocation {
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
}
