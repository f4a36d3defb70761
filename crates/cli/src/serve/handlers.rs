//! Route handlers for the transaction endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lineage_service::ServiceError;
use serde::Deserialize;
use tracing::warn;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// Status code for a service failure.
fn service_error(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::UnknownTransaction { .. } => StatusCode::NOT_FOUND,
        ServiceError::StepOutOfRange { .. } => StatusCode::BAD_REQUEST,
        _ => {
            warn!(error = %err, "pipeline failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, &err.to_string()).into_response()
}

/// GET /transaction/steps
pub(crate) async fn handle_steps(State(state): State<Arc<AppState>>) -> Response {
    match state.service.fetch_steps().await {
        Ok(steps) => (StatusCode::OK, Json(steps)).into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /transaction/init
pub(crate) async fn handle_init(State(state): State<Arc<AppState>>) -> Response {
    match state.service.initialize().await {
        Ok(init) => (StatusCode::OK, Json(init)).into_response(),
        Err(e) => service_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessQuery {
    step_index: usize,
}

/// GET /transaction/{id}/process?step_index={i}
pub(crate) async fn handle_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<ProcessQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &format!("invalid step_index: {}", rejection.body_text()),
            )
            .into_response()
        }
    };
    match state.service.process_step(&id, query.step_index).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /transaction/{id}/reset
pub(crate) async fn handle_reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.service.reset(&id).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => service_error(e),
    }
}
