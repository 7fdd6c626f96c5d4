//! Liveness endpoints

use axum::Json;

use crate::types::StatusResponse;

/// GET /
pub async fn index() -> Json<StatusResponse> {
    Json(StatusResponse::new("OK"))
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
