//! HTTP API server process (§6), separate from the `hardgates` CLI the same
//! way the original prototype split its FastAPI server from its scan CLI.

use std::sync::Arc;

use hardgates_rs::core::config::HardGatesConfig;
use hardgates_rs::registry::sweeper;
use hardgates_rs::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = HardGatesConfig::from_env();
    let retention = chrono::Duration::days(config.storage.retention_days);
    let bind = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState::build(config).await?);
    tokio::spawn(sweeper::run(Arc::clone(&state.registry), retention));

    let router = hardgates_rs::api::build_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(bind.as_str()).await?;
    info!(%bind, "hard gates API listening");
    axum::serve(listener, router).await?;

    Ok(())
}
