//! HTML rendering for a [`ScanResult`], via a single `handlebars` template.

use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::core::config::HardGatesConfig;
use crate::core::errors::{HardGatesError, Result};
use crate::core::model::{GateResult, GateStatus, ScanResult};

const TEMPLATE: &str = include_str!("report.hbs");
const TEMPLATE_NAME: &str = "report";

static ENGINE: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string(TEMPLATE_NAME, TEMPLATE)
        .expect("bundled report template must be valid handlebars");
    handlebars
});

#[derive(Serialize)]
struct GateView {
    gate_name: String,
    display_name: String,
    status: &'static str,
    status_class: &'static str,
    score: f64,
    recommendation: String,
    match_count: usize,
}

#[derive(Serialize)]
struct ReportView {
    scan_id: String,
    overall_score: f64,
    incomplete: bool,
    file_count: usize,
    primary_technologies: Vec<String>,
    applicable_gates: Vec<GateView>,
    non_applicable_gates: Vec<GateView>,
    recommendation_max_chars: usize,
}

fn status_label(status: GateStatus) -> (&'static str, &'static str) {
    match status {
        GateStatus::Pass => ("PASS", "pass"),
        GateStatus::Warning => ("WARNING", "warning"),
        GateStatus::Fail => ("FAIL", "fail"),
        GateStatus::NotApplicable => ("N/A", "not-applicable"),
    }
}

fn gate_view(gate: &GateResult) -> GateView {
    let (status, status_class) = status_label(gate.status);
    GateView {
        gate_name: gate.gate_name.clone(),
        display_name: gate.display_name.clone(),
        status,
        status_class,
        score: gate.score,
        recommendation: gate.recommendation.clone(),
        match_count: gate.matches.len(),
    }
}

/// Render `result` into a self-contained HTML document.
pub fn render(result: &ScanResult, config: &HardGatesConfig) -> Result<String> {
    let view = ReportView {
        scan_id: result.scan_id.to_string(),
        overall_score: result.overall_score,
        incomplete: result.incomplete,
        file_count: result.metadata.file_count,
        primary_technologies: result.metadata.primary_technologies.clone(),
        applicable_gates: result.applicable_gates.iter().map(gate_view).collect(),
        non_applicable_gates: result.non_applicable_gates.iter().map(gate_view).collect(),
        recommendation_max_chars: config.recommendation_max_chars,
    };

    ENGINE
        .render(TEMPLATE_NAME, &view)
        .map_err(|e| HardGatesError::internal(format!("rendering HTML report: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_compiles_at_module_load() {
        Lazy::force(&ENGINE);
    }
}
