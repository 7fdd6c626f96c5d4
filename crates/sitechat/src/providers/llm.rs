//! Chat-completion provider trait and the message types it exchanges

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message of a chat conversation (OpenAI wire shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call answered by a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_content(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_content(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_content(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, content)
    }

    /// Assistant turn that only requests tool calls
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Result of a tool call, sent back to the model
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Text content, empty when absent
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

/// Name and raw JSON arguments of a requested call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Tool definition offered to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl ToolSpec {
    /// Convert to OpenAI API format
    pub fn to_openai_format(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

/// Trait for chat-completion models
///
/// Implementations:
/// - `OpenAiClient`: OpenAI `/chat/completions`
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Next assistant message for a conversation, optionally offering tools
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatMessage>;

    /// Single-prompt completion without tools
    async fn generate(&self, prompt: &str) -> Result<String> {
        let reply = self.complete(&[ChatMessage::user(prompt)], &[]).await?;
        Ok(reply.text().to_string())
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_format() {
        let call = ToolCall::new("call_1", "http_tool", r#"{"url":"https://example.com"}"#);
        let value = serde_json::to_value(ChatMessage::assistant_tool_calls(vec![call])).unwrap();

        assert_eq!(value["role"], "assistant");
        assert!(value.get("content").is_none());
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "http_tool");

        let value = serde_json::to_value(ChatMessage::tool_result("call_1", "ok")).unwrap();
        assert_eq!(value, json!({"role": "tool", "content": "ok", "tool_call_id": "call_1"}));
    }

    #[test]
    fn test_tool_spec_format() {
        let spec = ToolSpec {
            name: "tag_exists_tool".into(),
            description: "Check for a tag".into(),
            parameters: json!({"type": "object"}),
        };
        let value = spec.to_openai_format();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "tag_exists_tool");
    }
}
