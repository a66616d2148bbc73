//! `hardgates` CLI entry point (§6).

use clap::Parser;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let exit_code = match cli.command {
        Commands::Scan(args) => cli::scan_command(args).await,
        Commands::View(args) => cli::view_command(args).await,
        Commands::Gates => cli::gates_command().await,
    };

    std::process::exit(exit_code);
}
