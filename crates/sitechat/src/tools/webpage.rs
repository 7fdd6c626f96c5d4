//! Web page inspection tools: tag presence and form field discovery

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, Tool, ToolOutcome};
use crate::error::{Error, Result};
use crate::ingestion::selector;

/// An `<input>` of a page's form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Value of the `name` attribute
    pub field_name: String,
    /// Value of the `placeholder` attribute, empty when absent
    pub placeholder: String,
}

/// Whether the page at `url` contains at least one `<tag_name>` element.
///
/// The response status is not checked; fetch failures propagate.
pub async fn tag_exists(client: &Client, tag_name: &str, url: &str) -> Result<bool> {
    let tag = tag_name.trim();
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::InvalidArgument(format!("Invalid tag name '{}'", tag_name)));
    }

    let html = client.get(url).send().await?.text().await?;
    html_has_tag(&html, tag)
}

/// Whether `html` contains an element named `tag`
pub fn html_has_tag(html: &str, tag: &str) -> Result<bool> {
    let selector = selector(tag)?;
    Ok(Html::parse_document(html).select(&selector).next().is_some())
}

/// Inputs of the page at `url` whose `name` starts with `prefix`.
///
/// Fetch errors and non-2xx responses are reported as `Failed`.
pub async fn fetch_field(client: &Client, prefix: &str, url: &str) -> ToolOutcome<Vec<FormField>> {
    let response = match client.get(url).send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => response,
        Err(e) => return ToolOutcome::Failed(format!("Error fetching URL: {}", e)),
    };

    let html = match response.text().await {
        Ok(html) => html,
        Err(e) => return ToolOutcome::Failed(format!("Error fetching URL: {}", e)),
    };

    match extract_fields(&html, prefix) {
        Ok(fields) => ToolOutcome::Ok(fields),
        Err(e) => ToolOutcome::Failed(e.to_string()),
    }
}

/// Inputs of `html` whose `name` starts with `prefix`, in document order
pub fn extract_fields(html: &str, prefix: &str) -> Result<Vec<FormField>> {
    let selector = selector("input[name]")?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            if !name.starts_with(prefix) {
                return None;
            }
            Some(FormField {
                field_name: name.to_string(),
                placeholder: input.value().attr("placeholder").unwrap_or("").to_string(),
            })
        })
        .collect())
}

#[derive(Deserialize)]
struct TagExistsArgs {
    tag_name: String,
    url: String,
}

/// `tag_exists_tool`: tells the agent whether a page has e.g. a `<form>`
pub struct TagExistsTool {
    client: Client,
}

impl TagExistsTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for TagExistsTool {
    fn name(&self) -> &str {
        "tag_exists_tool"
    }

    fn description(&self) -> &str {
        "Checks whether a specific HTML tag exists on the page at a URL. Returns true or false."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tag_name": {"type": "string", "description": "HTML tag to look for, e.g. form"},
                "url": {"type": "string", "description": "Page URL"}
            },
            "required": ["tag_name", "url"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: TagExistsArgs = parse_args(self.name(), args)?;
        let found = tag_exists(&self.client, &args.tag_name, &args.url).await?;
        Ok(found.to_string())
    }
}

#[derive(Deserialize)]
struct FetchFieldArgs {
    input_name: String,
    url: String,
}

/// `fetch_field_tool`: lists the form fields the agent has to ask the visitor for
pub struct FetchFieldTool {
    client: Client,
}

impl FetchFieldTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FetchFieldTool {
    fn name(&self) -> &str {
        "fetch_field_tool"
    }

    fn description(&self) -> &str {
        "Fetches the HTML input elements of a page whose name attribute starts with the given \
         input name. Returns the list of fields with their name and placeholder. If an error \
         occurs, the list is empty and the error is included."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input_name": {"type": "string", "description": "Name prefix, e.g. field_"},
                "url": {"type": "string", "description": "Page URL"}
            },
            "required": ["input_name", "url"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: FetchFieldArgs = parse_args(self.name(), args)?;

        let rendered = match fetch_field(&self.client, &args.input_name, &args.url).await {
            ToolOutcome::Ok(fields) => json!({ "fields": fields }),
            ToolOutcome::Failed(message) => {
                tracing::warn!("fetch_field_tool failed for {}: {}", args.url, message);
                json!({ "fields": [], "error": message })
            }
        };
        Ok(rendered.to_string())
    }
}
