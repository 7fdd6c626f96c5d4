//! Chat endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::json_body;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{api::required_field, QueryRequest, QueryResponse};

/// POST /query - Send a visitor message to the active agent
pub async fn query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let request = json_body(payload)?;
    let query = required_field(request.query, "Query")?;
    let agent = state.active_agent()?;

    tracing::info!("Query: \"{}\"", query);

    let session = request
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let reply = match session {
        Some(session) => agent.chat_in_session(session, &query).await,
        None => agent.chat(&query).await,
    };
    let response = reply.map_err(|e| Error::Unexpected(format!("Failed to process query: {}", e)))?;

    Ok(Json(QueryResponse { response }))
}
