//! Console output: a progress spinner during a scan, a results table once
//! it finishes, matching the teacher's `console`/`indicatif`/`tabled` stack.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{settings::Style as TableStyle, Table, Tabled};

use hardgates_rs::core::model::{GateResult, GateStatus, ScanResult};

/// Spinner driven by the job registry's progress percentage.
pub fn scan_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .expect("spinner template is valid")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[derive(Tabled)]
struct GateRow {
    #[tabled(rename = "Gate")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Matches")]
    matches: usize,
}

fn status_cell(status: GateStatus) -> String {
    match status {
        GateStatus::Pass => style("PASS").green().to_string(),
        GateStatus::Warning => style("WARNING").yellow().to_string(),
        GateStatus::Fail => style("FAIL").red().to_string(),
        GateStatus::NotApplicable => style("N/A").dim().to_string(),
    }
}

fn gate_row(gate: &GateResult) -> GateRow {
    GateRow {
        name: gate.gate_name.clone(),
        status: status_cell(gate.status),
        score: format!("{:.1}", gate.score),
        matches: gate.counts.matches_found,
    }
}

/// Print a human-readable summary of a completed scan: overall score, a
/// table of applicable gates, and a note about any non-applicable ones.
pub fn print_scan_summary(result: &ScanResult, threshold: f64) {
    let verdict = if result.meets_threshold(threshold) {
        style("PASS").green().bold()
    } else {
        style("FAIL").red().bold()
    };

    println!(
        "\n{} {} (threshold {:.1}) — overall score {}",
        style("Result:").bold(),
        verdict,
        threshold,
        style(format!("{:.1}", result.overall_score)).bold()
    );

    if result.incomplete {
        println!(
            "{}",
            style("⚠ scan hit its deadline before finishing; results are partial").yellow()
        );
    }

    let rows: Vec<GateRow> = result.applicable_gates.iter().map(gate_row).collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows).with(TableStyle::rounded()));
    }

    if !result.non_applicable_gates.is_empty() {
        println!(
            "\n{} {}",
            style("Not applicable:").dim(),
            result
                .non_applicable_gates
                .iter()
                .map(|g| g.gate_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    if !result.errors.is_empty() {
        println!("\n{}", style(format!("{} error(s) recorded:", result.errors.len())).red());
        for error in &result.errors {
            println!("  [{}] {}", error.stage, error.message);
        }
    }
}
