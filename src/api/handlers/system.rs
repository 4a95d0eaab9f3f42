//! System endpoints: health check and maintenance.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::service::SweepReport;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    facilities: usize,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp and the number of registered facilities.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let facilities = state.facility_service.list().await.len();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            facilities,
        }),
    )
}

/// `POST /api/v1/maintenance/sweep`: Run one expiration sweep now.
#[utoipa::path(
    post,
    path = "/api/v1/maintenance/sweep",
    tag = "System",
    summary = "Sweep expired reservations",
    description = "Cancels every `pendiente` reservation older than the pending TTL, exactly as the periodic sweeper does.",
    responses(
        (status = 200, description = "Sweep outcome", body = SweepReport),
    )
)]
pub async fn sweep_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.reservation_service.sweep_expired().await)
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// Maintenance routes nested under /api/v1.
pub fn maintenance_routes() -> Router<AppState> {
    Router::new().route("/maintenance/sweep", post(sweep_handler))
}
