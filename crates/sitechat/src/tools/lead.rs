//! Lead submission URL builder for the marketing-automation form endpoint

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::Tool;
use crate::error::{Error, Result};

/// Key holding the form's embed code
pub const EMBED_CODE_KEY: &str = "embedCode";
/// Prefix of the keys that are submitted as form fields
pub const FIELD_PREFIX: &str = "field_";

/// Build the submission URL for a lead.
///
/// `details` holds `embedCode` and any number of `field_*` entries; other keys
/// are ignored. The result is
/// `endpoint + encoded(embedCode) + "/jsonp/?" + form-encoded(fields)`,
/// with fields in key order.
pub fn build_submission_url(endpoint: &str, details: &Map<String, Value>) -> String {
    let embed_code = details
        .get(EMBED_CODE_KEY)
        .map(value_text)
        .unwrap_or_default();

    let fields: BTreeMap<&str, String> = details
        .iter()
        .filter(|(key, _)| key.starts_with(FIELD_PREFIX))
        .map(|(key, value)| (key.as_str(), value_text(value)))
        .collect();

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();

    format!(
        "{}{}/jsonp/?{}",
        endpoint,
        encode_path(&embed_code),
        query
    )
}

/// Percent-encode a path segment, leaving `/` alone
fn encode_path(segment: &str) -> String {
    urlencoding::encode(segment).replace("%2F", "/")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `sharpspring_tool`: turns collected form details into a submission URL for
/// `http_tool`
pub struct LeadSubmissionTool {
    endpoint: String,
}

impl LeadSubmissionTool {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Tool for LeadSubmissionTool {
    fn name(&self) -> &str {
        "sharpspring_tool"
    }

    fn description(&self) -> &str {
        "Creates a SharpSpring lead submission URL that can then be called with http_tool. \
         Takes the form's embedCode and the field_* values collected from the visitor."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "embedCode": {"type": "string", "description": "Embed code of the form"}
            },
            "additionalProperties": {"type": "string"},
            "required": ["embedCode"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        match args {
            Value::Object(details) => Ok(build_submission_url(&self.endpoint, &details)),
            other => Err(Error::InvalidArgument(format!(
                "sharpspring_tool expects an object, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://app-3qnd.marketingautomation.services/webforms/receivePostback/MzY0";

    fn details(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_build_url() {
        let url = build_submission_url(
            ENDPOINT,
            &details(json!({
                "embedCode": "abc-123",
                "field_first_name": "Jane Doe",
                "field_email": "jane@example.com",
                "utm_source": "ignored"
            })),
        );
        assert_eq!(
            url,
            format!(
                "{}abc-123/jsonp/?field_email=jane%40example.com&field_first_name=Jane+Doe",
                ENDPOINT
            )
        );
    }

    #[test]
    fn test_embed_code_encoding() {
        let url = build_submission_url("https://x/", &details(json!({"embedCode": "a b/c?"})));
        assert_eq!(url, "https://x/a%20b/c%3F/jsonp/?");
    }

    #[test]
    fn test_missing_embed_code_and_non_string_values() {
        let url = build_submission_url(
            "https://x/",
            &details(json!({"field_count": 3, "field_opt_in": true, "field_none": null})),
        );
        assert_eq!(url, "https://x//jsonp/?field_count=3&field_none=&field_opt_in=true");
    }

    #[tokio::test]
    async fn test_tool_rejects_non_object() {
        let tool = LeadSubmissionTool::new(ENDPOINT);
        assert!(matches!(
            tool.call(json!(["embedCode"])).await,
            Err(Error::InvalidArgument(_))
        ));
        let url = tool.call(json!({"embedCode": "e1"})).await.unwrap();
        assert!(url.ends_with("e1/jsonp/?"));
    }
}
