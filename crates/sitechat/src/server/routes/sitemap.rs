//! Sitemap crawl endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::json_body;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{api::required_field, SitemapRequest, SitemapResponse};

/// PUT /sitemap - Crawl a sitemap into an initialized collection
pub async fn update_sitemap(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SitemapRequest>, JsonRejection>,
) -> Result<Json<SitemapResponse>> {
    let request = json_body(payload)?;
    let sitemap_url = required_field(request.sitemap_url, "Sitemap URL")?;
    let domain = required_field(request.domain, "Domain")?;
    let collection_name = required_field(request.collection_name, "Collection name")?;

    let documents_processed = state
        .update_from_sitemap(&sitemap_url, &domain, &collection_name)
        .await
        .map_err(|e| match e {
            // Unknown collection is a 500 on this endpoint
            Error::NotInitialized(_) => Error::Unexpected(e.to_string()),
            other => other,
        })?;

    Ok(Json(SitemapResponse {
        status: "OK".to_string(),
        documents_processed,
    }))
}
