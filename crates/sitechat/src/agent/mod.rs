//! Agent layer: a tool-calling chat loop over an `LlmProvider`
//!
//! The service only depends on [`ChatAgent`]. [`ToolCallingAgent`] implements
//! it with the usual function-calling loop: the model either answers with
//! text, which ends the turn, or requests tool calls whose results are sent
//! back until it does.

pub mod prompt;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{ChatMessage, LlmProvider, ToolCall, ToolSpec};
use crate::storage::CollectionIndex;
use crate::tools::{FetchFieldTool, HttpTool, KnowledgeTool, LeadSubmissionTool, TagExistsTool, Tool};

pub use prompt::{PromptBuilder, WEBSITE_AGENT_PROMPT};

/// Session used when the caller does not name one
pub const DEFAULT_SESSION: &str = "default";

/// Conversational interface the HTTP service talks to
#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Answer one user message, keeping the conversation going
    async fn chat(&self, text: &str) -> Result<String>;

    /// Answer within a named conversation; sessions do not see each other
    async fn chat_in_session(&self, session: &str, text: &str) -> Result<String> {
        let _ = session;
        self.chat(text).await
    }
}

/// Builder for a [`ToolCallingAgent`]
pub struct AgentBuilder {
    llm: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
    tools: Vec<Box<dyn Tool>>,
    max_iterations: usize,
    memory_messages: usize,
    max_sessions: usize,
}

impl AgentBuilder {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            system_prompt: None,
            tools: Vec::new(),
            max_iterations: 20,
            memory_messages: 40,
            max_sessions: 1024,
        }
    }

    /// Website agent over a collection: knowledge base plus the
    /// download-guide tools
    pub fn for_collection(
        index: Arc<CollectionIndex>,
        llm: Arc<dyn LlmProvider>,
        http_client: Client,
        config: &RagConfig,
    ) -> Self {
        let knowledge = KnowledgeTool::new(index, Arc::clone(&llm), config.agent.top_k);

        Self::new(llm)
            .system(WEBSITE_AGENT_PROMPT)
            .tool(knowledge)
            .tool(HttpTool::new(http_client.clone()))
            .tool(TagExistsTool::new(http_client.clone()))
            .tool(FetchFieldTool::new(http_client))
            .tool(LeadSubmissionTool::new(config.lead.endpoint.clone()))
            .max_iterations(config.agent.max_iterations)
            .memory_messages(config.agent.memory_messages)
            .max_sessions(config.agent.max_sessions)
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    /// Model calls allowed per turn before giving up
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Past user and assistant messages replayed to the model
    pub fn memory_messages(mut self, count: usize) -> Self {
        self.memory_messages = count;
        self
    }

    /// Conversations kept at once; the least recently used is dropped
    pub fn max_sessions(mut self, count: usize) -> Self {
        self.max_sessions = count.max(1);
        self
    }

    pub fn build(self) -> ToolCallingAgent {
        ToolCallingAgent {
            llm: self.llm,
            system_prompt: self.system_prompt,
            tools: self.tools,
            max_iterations: self.max_iterations,
            memory_messages: self.memory_messages,
            max_sessions: self.max_sessions,
            sessions: DashMap::new(),
        }
    }
}

/// Memory of one conversation
struct Session {
    /// User messages and final replies of past turns
    history: Mutex<Vec<ChatMessage>>,
    last_used: parking_lot::Mutex<Instant>,
}

impl Session {
    fn new() -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            last_used: parking_lot::Mutex::new(Instant::now()),
        }
    }
}

/// Function-calling agent with bounded, per-session conversation memory
pub struct ToolCallingAgent {
    llm: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
    tools: Vec<Box<dyn Tool>>,
    max_iterations: usize,
    memory_messages: usize,
    max_sessions: usize,
    sessions: DashMap<String, Arc<Session>>,
}

impl ToolCallingAgent {
    fn session(&self, id: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.get(id) {
            *session.last_used.lock() = Instant::now();
            return Arc::clone(session.value());
        }

        if self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| *entry.value().last_used.lock())
                .map(|entry| entry.key().clone());
            if let Some(oldest) = oldest {
                debug!("Dropping conversation '{}'", oldest);
                self.sessions.remove(&oldest);
            }
        }

        Arc::clone(
            self.sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Session::new()))
                .value(),
        )
    }

    #[cfg(test)]
    fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    async fn run_tool_loop(&self, mut messages: Vec<ChatMessage>) -> Result<String> {
        let specs: Vec<ToolSpec> = self.tools.iter().map(|t| t.spec()).collect();
        let mut iterations = 0;

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                warn!("Agent reached max iterations ({})", self.max_iterations);
                return Err(Error::llm(format!(
                    "Agent reached max iterations ({})",
                    self.max_iterations
                )));
            }

            debug!(
                "Agent iteration {} with {} messages via {}",
                iterations,
                messages.len(),
                self.llm.name()
            );

            let reply = self.llm.complete(&messages, &specs).await?;

            if reply.tool_calls.is_empty() {
                info!("Agent answered after {} iteration(s)", iterations);
                return Ok(reply.text().to_string());
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in &calls {
                info!("Executing tool {} ({})", call.function.name, call.id);
                let result = self.execute_tool(call).await;
                debug!("Tool {} returned {} bytes", call.function.name, result.len());
                messages.push(ChatMessage::tool_result(call.id.clone(), result));
            }
        }
    }

    /// Run one call; every failure becomes text for the model
    async fn execute_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.function.name) else {
            warn!("Unknown tool requested: {}", call.function.name);
            return format!("Error: Unknown tool '{}'", call.function.name);
        };

        let args = match parse_arguments(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!("Bad arguments for {}: {}", call.function.name, e);
                return format!("Error executing tool: invalid arguments: {}", e);
            }
        };

        match tool.call(args).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool {} failed: {}", call.function.name, e);
                format!("Error executing tool: {}", e)
            }
        }
    }
}

/// Raw argument string of a call; empty means no arguments
fn parse_arguments(raw: &str) -> serde_json::Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

#[async_trait]
impl ChatAgent for ToolCallingAgent {
    async fn chat(&self, text: &str) -> Result<String> {
        self.chat_in_session(DEFAULT_SESSION, text).await
    }

    async fn chat_in_session(&self, session: &str, text: &str) -> Result<String> {
        let session = self.session(session);
        // One turn per session at a time so its memory stays in order
        let mut history = session.history.lock().await;

        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(text));

        let answer = self.run_tool_loop(messages).await?;

        history.push(ChatMessage::user(text));
        history.push(ChatMessage::assistant(answer.clone()));
        if history.len() > self.memory_messages {
            let excess = history.len() - self.memory_messages;
            history.drain(..excess);
        }

        Ok(answer)
    }
}
