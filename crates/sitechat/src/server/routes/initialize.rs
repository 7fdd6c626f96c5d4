//! Collection initialization endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::json_body;
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{api::required_field, InitializeRequest, StatusResponse};

/// POST /initialize - Load or build a collection and wire the agent over it
pub async fn initialize(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InitializeRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>> {
    let request = json_body(payload)?;
    let name = required_field(request.collection_name, "Collection name")?;

    tracing::info!("Initializing collection '{}'", name);

    let status = state.initialize(&name).await?;
    Ok(Json(StatusResponse::new(status)))
}
