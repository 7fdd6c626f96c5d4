//! HTTP routes of the chatbot server

pub mod health;
pub mod initialize;
pub mod query;
pub mod sitemap;

use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post, put},
    Json, Router,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Build all routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        .route("/initialize", post(initialize::initialize))
        .route("/sitemap", put(sitemap::update_sitemap))
        .route("/query", post(query::query))
}

/// Unwrap a JSON body, reporting a malformed one as a validation error
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(Error::validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        ))),
    }
}
