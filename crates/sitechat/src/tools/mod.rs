//! Tools the agent can call
//!
//! Each tool has a plain async function doing the work and a thin `Tool`
//! wrapper that exposes it to the model with a name, a description and a
//! JSON schema for its arguments.

pub mod http_request;
pub mod knowledge;
pub mod lead;
pub mod webpage;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::providers::ToolSpec;

pub use http_request::{http_request, HttpMethod, HttpResponse, HttpTool};
pub use knowledge::KnowledgeTool;
pub use lead::{build_submission_url, LeadSubmissionTool};
pub use webpage::{fetch_field, tag_exists, FetchFieldTool, FormField, TagExistsTool};

/// Result of a tool that reports failures as data instead of errors
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome<T> {
    Ok(T),
    Failed(String),
}

/// A capability exposed to the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model calls the tool by
    fn name(&self) -> &str;

    /// What the tool does, shown to the model
    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Run the tool; the returned text is handed back to the model
    async fn call(&self, args: Value) -> Result<String>;

    /// Tool definition offered to the model
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Decode tool arguments, reporting bad ones as an invalid argument
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| Error::InvalidArgument(format!("{}: {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Args {
        url: String,
    }

    #[test]
    fn test_parse_args() {
        let args: Args = parse_args("http_tool", json!({"url": "https://example.com"})).unwrap();
        assert_eq!(args.url, "https://example.com");

        let err = parse_args::<Args>("http_tool", json!({"link": 1})).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.starts_with("http_tool")));
    }
}
