//! Report generation: an external collaborator by design (§7 REDESIGN
//! FLAGS). The core engine emits a fully-populated [`ScanResult`]; this
//! module is the one place that renders it to bytes on disk, so it can be
//! swapped without touching the gate engine or pipeline.

mod html;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::instrument;

use crate::core::config::HardGatesConfig;
use crate::core::errors::{HardGatesError, Result};
use crate::core::model::{ReportFormat, ScanResult};
use crate::core::pipeline::stages::Workspace;
use crate::inventory::Inventory;

/// Paths to the rendered report artifacts, if any were produced.
#[derive(Debug, Clone, Default)]
pub struct ReportPaths {
    /// Path to the rendered HTML report, if requested.
    pub html: Option<PathBuf>,
    /// Path to the rendered JSON report, if requested.
    pub json: Option<PathBuf>,
}

fn reports_dir() -> PathBuf {
    std::env::temp_dir().join("hardgates-reports")
}

/// Assemble the full [`ScanResult`] for a workspace once `ValidateGates` has run.
pub fn build_scan_result(workspace: &Workspace, inventory: &Inventory) -> ScanResult {
    let overall_score = crate::gates::scorer::overall_weighted_score(
        &workspace
            .applicable_gates
            .iter()
            .map(|g| (g.score, g.weight))
            .collect::<Vec<_>>(),
    );

    let now = Utc::now();
    ScanResult {
        scan_id: workspace.scan_id,
        overall_score,
        applicable_gates: workspace.applicable_gates.clone(),
        non_applicable_gates: workspace.non_applicable_gates.clone(),
        metadata: inventory.metadata.clone(),
        errors: workspace.errors.clone(),
        incomplete: workspace.incomplete,
        created_at: now,
        updated_at: now,
        completed_at: Some(now),
    }
}

/// Render `result` in the requested format(s), writing under a per-process
/// reports directory keyed by scan ID, and return the paths written.
#[instrument(skip(result, config))]
pub fn render(result: &ScanResult, format: ReportFormat, config: &HardGatesConfig) -> Result<ReportPaths> {
    let dir = reports_dir();
    std::fs::create_dir_all(&dir)?;

    let mut paths = ReportPaths::default();

    match format {
        ReportFormat::Html => {
            paths.html = Some(write_html(result, &dir, config)?);
        }
        ReportFormat::Json => {
            paths.json = Some(write_json(result, &dir)?);
        }
        ReportFormat::Both => {
            paths.html = Some(write_html(result, &dir, config)?);
            paths.json = Some(write_json(result, &dir)?);
        }
        ReportFormat::Pdf => {
            return Err(HardGatesError::feature_unavailable("pdf report generation"));
        }
    }

    Ok(paths)
}

fn write_json(result: &ScanResult, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", result.scan_id));
    let content = serde_json::to_string_pretty(result)?;
    std::fs::write(&path, content)?;
    Ok(path)
}

fn write_html(result: &ScanResult, dir: &Path, config: &HardGatesConfig) -> Result<PathBuf> {
    let path = dir.join(format!("{}.html", result.scan_id));
    let content = html::render(result, config)?;
    std::fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{DetectedCategories, GateCounts, GateResult, GateStatus, RepoMetadata};
    use std::collections::HashMap;

    fn sample_result(scan_id: uuid::Uuid) -> ScanResult {
        ScanResult {
            scan_id,
            overall_score: 82.0,
            applicable_gates: vec![GateResult {
                gate_name: "STRUCTURED_LOGS".to_string(),
                display_name: "Structured Logs".to_string(),
                category: "logging".to_string(),
                priority: "high".to_string(),
                status: GateStatus::Pass,
                score: 90.0,
                weight: 1.0,
                matches: Vec::new(),
                counts: GateCounts::default(),
                validation_sources: Vec::new(),
                recommendation: "Looks good.".to_string(),
                not_applicable_reason: String::new(),
                partial: false,
            }],
            non_applicable_gates: Vec::new(),
            metadata: RepoMetadata {
                working_tree_path: PathBuf::from("/tmp/repo"),
                file_count: 10,
                total_lines: 500,
                language_stats: HashMap::new(),
                build_tools: Vec::new(),
                frameworks: Vec::new(),
                deployment_platforms: Vec::new(),
                commit_hash: None,
                last_commit_date: None,
                primary_technologies: vec!["python".to_string()],
                detected_categories: DetectedCategories::default(),
            },
            errors: Vec::new(),
            incomplete: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn json_rendering_round_trips_through_serde() {
        let result = sample_result(uuid::Uuid::new_v4());
        let config = HardGatesConfig::default();
        let paths = render(&result, ReportFormat::Json, &config).unwrap();

        let json_path = paths.json.expect("json path should be set");
        let content = std::fs::read_to_string(&json_path).unwrap();
        let parsed: ScanResult = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.scan_id, result.scan_id);
        std::fs::remove_file(json_path).ok();
    }

    #[test]
    fn html_rendering_embeds_the_overall_score() {
        let result = sample_result(uuid::Uuid::new_v4());
        let config = HardGatesConfig::default();
        let paths = render(&result, ReportFormat::Html, &config).unwrap();

        let html_path = paths.html.expect("html path should be set");
        let content = std::fs::read_to_string(&html_path).unwrap();
        assert!(content.contains("82"));
        assert!(content.contains("STRUCTURED_LOGS"));
        std::fs::remove_file(html_path).ok();
    }

    #[test]
    fn pdf_format_is_unavailable() {
        let result = sample_result(uuid::Uuid::new_v4());
        let config = HardGatesConfig::default();
        let err = render(&result, ReportFormat::Pdf, &config).unwrap_err();
        assert!(matches!(err, HardGatesError::FeatureUnavailable { .. }));
    }
}
