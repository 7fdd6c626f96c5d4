//! Request and response bodies of the HTTP API
//!
//! Request fields are optional at the serde level so that a missing field is
//! reported as a validation error with a readable message instead of a JSON
//! rejection.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `POST /initialize`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Collection to load or build
    #[serde(default)]
    pub collection_name: Option<String>,
}

/// `PUT /sitemap`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitemapRequest {
    /// URL of the sitemap XML
    #[serde(default)]
    pub sitemap_url: Option<String>,
    /// Domain or URL prefix that crawled pages must match
    #[serde(default)]
    pub domain: Option<String>,
    /// Target collection, which must have been initialized
    #[serde(default)]
    pub collection_name: Option<String>,
}

/// `POST /query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Visitor message
    #[serde(default)]
    pub query: Option<String>,
    /// Conversation to continue; requests without one share a default conversation
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Generic status body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// `PUT /sitemap` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapResponse {
    pub status: String,
    pub documents_processed: usize,
}

/// `POST /query` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Unwrap a request field, rejecting missing or blank values
pub fn required_field(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::validation(format!("{} not provided", label))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field() {
        assert_eq!(required_field(Some(" faq ".into()), "Collection name").unwrap(), "faq");

        let err = required_field(Some("   ".into()), "Query").unwrap_err();
        assert_eq!(err.to_string(), "Query not provided");

        assert!(required_field(None, "Query").is_err());
    }

    #[test]
    fn test_missing_fields_deserialize() {
        let req: SitemapRequest = serde_json::from_str(r#"{"domain": "example.com"}"#).unwrap();
        assert!(req.sitemap_url.is_none());
        assert_eq!(req.domain.as_deref(), Some("example.com"));
    }
}
