//! HTTP handlers for bms-service.
//!
//! Every `/api` handler takes an [`AuthContext`](crate::middleware::AuthContext),
//! checks one permission and passes the caller's organization down to the
//! repositories, so records of other organizations are never visible.

pub mod assets;
pub mod auth;
pub mod billing;
pub mod buildings;
pub mod flags;
pub mod maintenance;
pub mod meters;
pub mod notifications;
pub mod reports;
pub mod security;
pub mod tenants;
pub mod uploads;
pub mod users;
pub mod utility_payments;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::services::get_metrics;
use crate::AppState;

pub(crate) fn not_found(entity: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("{} not found", entity))
}

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "bms-service" })),
    )
}

pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        AppError::ServiceUnavailable
    })?;
    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        get_metrics(),
    )
}
