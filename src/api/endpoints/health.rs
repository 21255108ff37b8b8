//! Health check endpoint.

use axum::Json;

use crate::config::APP_VERSION;
use crate::models::HealthResponse;

/// `GET /api/health`: liveness check, no session required.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: APP_VERSION.into(),
    })
}
