//! CLI argument structures (§6 CLI surface).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Enterprise code-hygiene auditor.
#[derive(Parser)]
#[command(name = "hardgates")]
#[command(version = VERSION)]
#[command(about = "Audit a repository against a catalog of hard gates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone (or reference) a repository and run every applicable gate.
    Scan(ScanArgs),
    /// Open a previously generated report.
    View(ViewArgs),
    /// List the gate catalog.
    Gates,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Repository URL to clone, or a local path.
    pub repository_url: String,

    /// Branch to check out. Defaults to the repository's default branch.
    #[arg(long)]
    pub branch: Option<String>,

    /// Access token for private repositories.
    #[arg(long)]
    pub token: Option<String>,

    /// Compliance threshold in [0, 100].
    #[arg(long, default_value_t = 70.0)]
    pub threshold: f64,

    /// Directory reports are written into.
    #[arg(short, long, default_value = "./hardgates-report")]
    pub output: PathBuf,

    /// Report format to generate.
    #[arg(short, long, value_enum, default_value = "both")]
    pub format: ReportFormatArg,

    /// Path to a custom pattern catalog document (overrides the bundled default).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Hard wall-clock deadline for the scan, in seconds.
    #[arg(long, default_value_t = 900)]
    pub timeout_secs: u64,
}

#[derive(Args)]
pub struct ViewArgs {
    /// Path to a rendered report (`.html` or `.json`), or a directory
    /// containing one named after a scan ID.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormatArg {
    Html,
    Json,
    Both,
}

impl From<ReportFormatArg> for hardgates_rs::core::model::ReportFormat {
    fn from(value: ReportFormatArg) -> Self {
        match value {
            ReportFormatArg::Html => Self::Html,
            ReportFormatArg::Json => Self::Json,
            ReportFormatArg::Both => Self::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_parses_with_defaults() {
        let cli = Cli::parse_from(["hardgates", "scan", "https://example.com/repo.git"]);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.repository_url, "https://example.com/repo.git");
                assert_eq!(args.threshold, 70.0);
                assert_eq!(args.output, PathBuf::from("./hardgates-report"));
                assert!(matches!(args.format, ReportFormatArg::Both));
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn scan_parses_overrides() {
        let cli = Cli::parse_from([
            "hardgates",
            "scan",
            "--branch",
            "develop",
            "--threshold",
            "85",
            "--format",
            "json",
            ".",
        ]);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.branch, Some("develop".to_string()));
                assert_eq!(args.threshold, 85.0);
                assert!(matches!(args.format, ReportFormatArg::Json));
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn view_requires_a_path() {
        let cli = Cli::parse_from(["hardgates", "view", "report.html"]);
        match cli.command {
            Commands::View(args) => assert_eq!(args.path, PathBuf::from("report.html")),
            _ => panic!("expected View command"),
        }
    }

    #[test]
    fn gates_takes_no_arguments() {
        let cli = Cli::parse_from(["hardgates", "gates"]);
        assert!(matches!(cli.command, Commands::Gates));
    }
}
