//! Error types for the chatbot backend

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for chatbot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Chatbot backend errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad or missing request field
    #[error("{0}")]
    Validation(String),

    /// Argument rejected before any side effect happened
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Collection or agent used before setup
    #[error("{0} is not initialized")]
    NotInitialized(String),

    /// Missing file or directory
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unreachable or misbehaving external resource
    #[error("Connection error: {0}")]
    Connection(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorDb(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Failure reported to the caller with its message as is
    #[error("{0}")]
    Unexpected(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status this error maps to at the service boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidArgument(_)
            | Error::NotInitialized(_)
            | Error::UnsupportedFileType(_)
            | Error::FileParse { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Connection(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_)
            | Error::Embedding(_)
            | Error::VectorDb(_)
            | Error::Llm(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Internal(_)
            | Error::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
