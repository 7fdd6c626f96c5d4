//! In-process fakes for the provider traits

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{ChatMessage, EmbeddingProvider, LlmProvider, Role, ToolSpec};

const FAKE_DIMENSION: usize = 512;

/// Hashed bag-of-words embedder: texts sharing words are close
#[derive(Default)]
pub struct FakeEmbedder {
    calls: AtomicUsize,
}

impl FakeEmbedder {
    /// Number of `embed`/`embed_batch` invocations so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; FAKE_DIMENSION];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() {
                continue;
            }
            // FNV-1a
            let hash = word
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
            vector[(hash % FAKE_DIMENSION as u64) as usize] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// LLM that plays back queued replies, then echoes the last user message
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ChatMessage>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    /// Queue plain text replies
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self::with_messages(replies.into_iter().map(ChatMessage::assistant).collect())
    }

    pub fn with_messages(replies: Vec<ChatMessage>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every conversation sent so far, including the system prompt
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }

    /// Last message text of every request
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| r.last().map(|m| m.text().to_string()))
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ChatMessage> {
        self.requests.lock().push(messages.to_vec());

        if let Some(reply) = self.replies.lock().pop_front() {
            return Ok(reply);
        }
        let echo = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text().to_string())
            .unwrap_or_default();
        Ok(ChatMessage::assistant(echo))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Config rooted in `dir` with the required secrets filled in
pub fn test_config(dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.llm.api_key = "test-key".to_string();
    config.lead.endpoint = "https://forms.example.com/receivePostback/abc/".to_string();
    config.storage.storage_root = dir.join("storage");
    config.ingestion.data_dir = dir.join("data");
    config
}
