//! HTTP API: a thin `axum` layer over the pipeline and job registry (§6).
//!
//! Routes map 1:1 onto spec.md §6's endpoint table. Handlers never touch
//! the gate engine directly; they only read the job registry, kick off a
//! [`crate::core::pipeline::Pipeline::run`] task, and read back from the
//! result store once a scan completes.

pub mod dto;
pub mod routes;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::errors::HardGatesError;

/// Wraps [`HardGatesError`] so handlers can return it directly from a
/// `Result`-returning axum handler.
pub struct ApiError(pub HardGatesError);

impl From<HardGatesError> for ApiError {
    fn from(source: HardGatesError) -> Self {
        Self(source)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HardGatesError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            HardGatesError::ScanNotFound { .. } => StatusCode::NOT_FOUND,
            HardGatesError::FeatureUnavailable { .. } => StatusCode::NOT_IMPLEMENTED,
            HardGatesError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            HardGatesError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub use routes::build_router;
