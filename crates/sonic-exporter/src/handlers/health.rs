use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::router::ExporterState;

/// Liveness only; store reachability is reported per domain through
/// `sonic_<domain>_collector_success`.
pub async fn health_live(State(state): State<Arc<ExporterState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            collectors: state.registry.len(),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    collectors: usize,
}
