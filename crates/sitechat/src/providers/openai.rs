//! OpenAI API client for embeddings and chat completions, with retry logic

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatMessage, LlmProvider, Role, ToolCall, ToolSpec};

/// OpenAI API client with automatic retry
pub struct OpenAiClient {
    /// HTTP client
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embed_model: String,
    temperature: f32,
    batch_size: usize,
    /// Maximum retries
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

/// Outcome of a failed request attempt
enum Attempt {
    /// Transport error, rate limit or server error
    Retry(Error),
    /// Anything a second try would not fix
    Fatal(Error),
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(llm: &LlmConfig, embeddings: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            api_key: llm.api_key.clone(),
            chat_model: llm.chat_model.clone(),
            embed_model: embeddings.model.clone(),
            temperature: llm.temperature,
            batch_size: embeddings.batch_size.max(1),
            max_retries: llm.max_retries,
        })
    }

    /// Retry a request with exponential backoff; fatal failures return at once
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, Attempt>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// POST a JSON body to `path`, wrapping every failure with `wrap`
    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        wrap: fn(String) -> Error,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        self.retry_request(|| {
            let url = url.clone();

            async move {
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| Attempt::Retry(wrap(format!("Request to {} failed: {}", path, e))))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    let error = wrap(format!("{} returned HTTP {} - {}", path, status, body));
                    return Err(if is_retryable(status) {
                        Attempt::Retry(error)
                    } else {
                        Attempt::Fatal(error)
                    });
                }

                response
                    .json::<T>()
                    .await
                    .map_err(|e| Attempt::Fatal(wrap(format!("Failed to parse {} response: {}", path, e))))
            }
        })
        .await
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::to_value(EmbedRequest {
            model: &self.embed_model,
            input: texts,
        })?;

        let response: EmbedResponse = self.post_json("/embeddings", &body, Error::Embedding).await?;

        if response.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_chunk(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_chunk(batch).await?);
        }
        Ok(embeddings)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatMessage> {
        let mut request = json!({
            "model": self.chat_model,
            "messages": messages,
            "temperature": self.temperature,
        });

        if !tools.is_empty() {
            request["tools"] = Value::Array(tools.iter().map(ToolSpec::to_openai_format).collect());
            request["tool_choice"] = json!("auto");
        }

        tracing::debug!(
            "Chat completion with model {} ({} messages, {} tools)",
            self.chat_model,
            messages.len(),
            tools.len()
        );

        let response: ChatResponse = self
            .post_json("/chat/completions", &request, Error::Llm)
            .await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::Llm("No message in response".to_string()))?;

        Ok(ChatMessage {
            role: Role::Assistant,
            content: message.content,
            tool_calls: message.tool_calls.unwrap_or_default(),
            tool_call_id: None,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
