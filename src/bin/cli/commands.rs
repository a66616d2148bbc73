//! CLI command implementations.

use std::path::Path;
use std::sync::Arc;

use console::style;
use tabled::{settings::Style as TableStyle, Table, Tabled};
use tracing::info;

use crate::cli::args::{ScanArgs, ViewArgs};
use crate::cli::output;
use hardgates_rs::core::config::HardGatesConfig;
use hardgates_rs::core::errors::Result;
use hardgates_rs::core::model::{JobState, ReportFormat, ScanId, ScanJob, ScanRequest, ScanResult};
use hardgates_rs::registry::JobRegistry;
use hardgates_rs::AppState;

/// Exit code contract (§6): 0 pass, 1 below threshold, 2 scanner error.
pub const EXIT_PASS: i32 = 0;
pub const EXIT_BELOW_THRESHOLD: i32 = 1;
pub const EXIT_SCANNER_ERROR: i32 = 2;

/// Run `hardgates scan`, returning the process exit code per §6.
pub async fn scan_command(args: ScanArgs) -> i32 {
    let config = HardGatesConfig {
        pattern_catalog_path: args.catalog.clone(),
        ..HardGatesConfig::from_env()
    };

    let state = match AppState::build(config).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            return EXIT_SCANNER_ERROR;
        }
    };

    let request = ScanRequest {
        repository_url: args.repository_url.clone(),
        branch: args.branch.clone(),
        credential: args.token.clone(),
        threshold: args.threshold,
        report_format: ReportFormat::from(args.format),
        scan_timeout_secs: args.timeout_secs,
    };
    if let Err(e) = request.validate() {
        eprintln!("{} {e}", style("error:").red().bold());
        return EXIT_SCANNER_ERROR;
    }

    let scan_id = ScanId::new_v4();
    state.registry.insert(ScanJob::new(scan_id, &request));

    let pb = output::scan_spinner();
    pb.set_message("starting scan...");

    let pipeline = Arc::clone(&state.pipeline);
    let config = Arc::clone(&state.config);
    let handle = tokio::spawn(async move {
        pipeline.run(scan_id, request, config).await;
    });

    let final_state = watch_until_terminal(&state.registry, scan_id, &pb).await;
    handle.await.ok();
    pb.finish_and_clear();

    match final_state {
        JobState::Completed => match state.store.get(scan_id).await {
            Ok(Some(result)) => {
                output::print_scan_summary(&result, args.threshold);
                if let Err(e) = hardgates_rs::report::render(&result, ReportFormat::from(args.format), &state.config)
                    .and_then(|paths| write_report_copies(&args.output, &paths))
                {
                    eprintln!("{} {e}", style("warning:").yellow().bold());
                }
                if result.meets_threshold(args.threshold) {
                    EXIT_PASS
                } else {
                    EXIT_BELOW_THRESHOLD
                }
            }
            _ => {
                eprintln!("{} scan completed but no result was persisted", style("error:").red().bold());
                EXIT_SCANNER_ERROR
            }
        },
        other => {
            let job = state.registry.get(scan_id);
            let message = job
                .and_then(|j| j.errors.last().cloned())
                .map(|e| e.message)
                .unwrap_or_else(|| format!("scan ended in state {other:?}"));
            eprintln!("{} {message}", style("error:").red().bold());
            EXIT_SCANNER_ERROR
        }
    }
}

/// Poll the job registry until the scan reaches a terminal state, updating
/// the spinner's message from `current_step`/`step_detail` as it goes.
async fn watch_until_terminal(registry: &JobRegistry, scan_id: ScanId, pb: &indicatif::ProgressBar) -> JobState {
    loop {
        let Some(job) = registry.get(scan_id) else {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            continue;
        };
        pb.set_message(format!(
            "{} ({:.0}%) {}",
            job.current_step, job.progress_percent, job.step_detail
        ));
        if job.state.is_terminal() {
            return job.state;
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}

fn write_report_copies(out_dir: &Path, paths: &hardgates_rs::report::ReportPaths) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    if let Some(html) = &paths.html {
        std::fs::copy(html, out_dir.join("report.html"))?;
    }
    if let Some(json) = &paths.json {
        std::fs::copy(json, out_dir.join("report.json"))?;
    }
    Ok(())
}

/// Run `hardgates view`.
pub async fn view_command(args: ViewArgs) -> i32 {
    let path = &args.path;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => match std::fs::read_to_string(path).and_then(|content| {
            serde_json::from_str::<ScanResult>(&content)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        }) {
            Ok(result) => {
                output::print_scan_summary(&result, 0.0);
                EXIT_PASS
            }
            Err(e) => {
                eprintln!("{} {e}", style("error:").red().bold());
                EXIT_SCANNER_ERROR
            }
        },
        Some("html") => {
            if open_in_browser(path).is_err() {
                println!("open this file in a browser: {}", path.display());
            }
            EXIT_PASS
        }
        _ => {
            eprintln!(
                "{} don't know how to view {}",
                style("error:").red().bold(),
                path.display()
            );
            EXIT_SCANNER_ERROR
        }
    }
}

#[cfg(target_os = "macos")]
fn open_in_browser(path: &Path) -> std::io::Result<std::process::ExitStatus> {
    std::process::Command::new("open").arg(path).status()
}

#[cfg(target_os = "linux")]
fn open_in_browser(path: &Path) -> std::io::Result<std::process::ExitStatus> {
    std::process::Command::new("xdg-open").arg(path).status()
}

#[cfg(target_os = "windows")]
fn open_in_browser(path: &Path) -> std::io::Result<std::process::ExitStatus> {
    std::process::Command::new("cmd").args(["/C", "start", ""]).arg(path).status()
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn open_in_browser(_path: &Path) -> std::io::Result<std::process::ExitStatus> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "no known browser launcher"))
}

/// Run `hardgates gates`.
pub async fn gates_command() -> i32 {
    let config = HardGatesConfig::from_env();
    let state = match AppState::build(config).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            return EXIT_SCANNER_ERROR;
        }
    };

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Gate")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Priority")]
        priority: String,
        #[tabled(rename = "Weight")]
        weight: String,
    }

    let mut names = state.library.gate_names();
    names.sort();
    let rows: Vec<Row> = names
        .into_iter()
        .filter_map(|name| {
            state.library.gate(&name).map(|def| Row {
                name,
                category: def.category.clone(),
                priority: format!("{:?}", def.priority),
                weight: format!("{:.1}", def.weight),
            })
        })
        .collect();

    info!(gate_count = rows.len(), "listing gate catalog");
    println!("{}", Table::new(rows).with(TableStyle::rounded()));
    EXIT_PASS
}
