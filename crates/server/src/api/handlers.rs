use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use nabgate_core::{SanitizedConfig, StatusReport};
use serde::Serialize;

use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Indexer health, refreshed at most every few minutes.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    let report = state.status().status().await;
    Json(report.as_ref().clone())
}

pub async fn get_metrics() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
        .into_response()
}
