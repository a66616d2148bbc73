//! Route handlers, wired onto a [`crate::AppState`] shared via `axum::State`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::dto::{
    GateInfo, GateResultsSummary, HealthResponse, ReportNotReady, ScanStatusResponse,
    StartScanRequest, StartScanResponse,
};
use crate::api::ApiError;
use crate::core::errors::HardGatesError;
use crate::core::model::{JobState, ReportFormat, ScanId, ScanJob, ScanRequest};
use crate::AppState;

/// Build the full `/api/v1` router over a shared [`AppState`].
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/scan", post(start_scan))
        .route("/api/v1/scan/{scan_id}", get(get_scan_status))
        .route("/api/v1/scan/{scan_id}/report/{format}", get(get_report))
        .route("/api/v1/gates", get(list_gates))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[instrument(skip(state))]
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_healthy = state.store.health().await.is_ok();
    let active_scans = state
        .registry
        .all()
        .values()
        .filter(|job| !job.state.is_terminal())
        .count();
    Json(HealthResponse {
        status: "healthy",
        store_healthy,
        active_scans,
    })
}

#[instrument(skip(state, body))]
async fn start_scan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartScanRequest>,
) -> Result<Json<StartScanResponse>, ApiError> {
    let request: ScanRequest = body.into_scan_request();
    request.validate().map_err(ApiError::from)?;

    let scan_id = ScanId::new_v4();
    let job = ScanJob::new(scan_id, &request);
    let created_at = job.created_at;
    state.registry.insert(job);

    let pipeline = Arc::clone(&state.pipeline);
    let config = Arc::clone(&state.config);
    tokio::spawn(async move {
        pipeline.run(scan_id, request, config).await;
    });

    Ok(Json(StartScanResponse {
        scan_id,
        status: "started",
        message: "scan initiated successfully",
        created_at,
    }))
}

#[instrument(skip(state))]
async fn get_scan_status(
    State(state): State<Arc<AppState>>,
    Path(scan_id): Path<ScanId>,
) -> Result<Json<ScanStatusResponse>, ApiError> {
    let job = state
        .registry
        .get(scan_id)
        .ok_or_else(|| HardGatesError::scan_not_found(scan_id))?;

    let stored = state.store.get(scan_id).await?;
    let gates = stored.as_ref().map(GateResultsSummary::from_result);

    let (html_report_url, json_report_url) = match job.state {
        JobState::Completed => (
            Some(format!("/api/v1/scan/{scan_id}/report/html")),
            Some(format!("/api/v1/scan/{scan_id}/report/json")),
        ),
        _ => (None, None),
    };

    Ok(Json(ScanStatusResponse {
        scan_id,
        status: job.state,
        overall_score: stored.as_ref().map(|r| r.overall_score).unwrap_or(0.0),
        score: stored.as_ref().map(|r| r.overall_score).unwrap_or(0.0),
        progress_percent: job.progress_percent,
        progress: job.progress_percent,
        current_step: job.current_step.clone(),
        step_details: job.step_detail.clone(),
        gate_results: gates.clone(),
        gates,
        errors: job.errors.clone(),
        incomplete: job.incomplete,
        html_report_url,
        json_report_url,
        created_at: job.created_at,
        completed_at: job.completed_at,
    }))
}

#[instrument(skip(state))]
async fn get_report(
    State(state): State<Arc<AppState>>,
    Path((scan_id, format)): Path<(ScanId, String)>,
) -> Result<axum::response::Response, ApiError> {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    let job = state
        .registry
        .get(scan_id)
        .ok_or_else(|| HardGatesError::scan_not_found(scan_id))?;

    if job.state != JobState::Completed {
        return Ok((StatusCode::ACCEPTED, Json(ReportNotReady::default())).into_response());
    }

    let Some(result) = state.store.get(scan_id).await? else {
        return Ok((StatusCode::ACCEPTED, Json(ReportNotReady::default())).into_response());
    };

    match format.as_str() {
        "json" => {
            let paths = crate::report::render(&result, ReportFormat::Json, &state.config)?;
            let path = paths.json.expect("json rendering always sets json path");
            let content = std::fs::read_to_string(path).map_err(HardGatesError::from)?;
            Ok((StatusCode::OK, [("content-type", "application/json")], content).into_response())
        }
        "html" => {
            let paths = crate::report::render(&result, ReportFormat::Html, &state.config)?;
            let path = paths.html.expect("html rendering always sets html path");
            let content = std::fs::read_to_string(path).map_err(HardGatesError::from)?;
            Ok((StatusCode::OK, [("content-type", "text/html")], content).into_response())
        }
        other => Err(HardGatesError::invalid_request(format!("unknown report format: {other}")).into()),
    }
}

#[instrument(skip(state))]
async fn list_gates(State(state): State<Arc<AppState>>) -> Json<Vec<GateInfo>> {
    let mut names = state.library.gate_names();
    names.sort();

    let gates = names
        .into_iter()
        .filter_map(|name| {
            state.library.gate(&name).map(|def| GateInfo {
                name: name.clone(),
                display_name: def.display_name.clone(),
                description: def.description.clone(),
                category: def.category.clone(),
                priority: format!("{:?}", def.priority).to_lowercase(),
                weight: def.weight,
            })
        })
        .collect();

    Json(gates)
}
