//! Knowledge base tool: retrieval plus a grounded answer from the LLM

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{parse_args, Tool};
use crate::agent::prompt::PromptBuilder;
use crate::error::Result;
use crate::providers::LlmProvider;
use crate::storage::CollectionIndex;

/// Answer given when retrieval finds nothing
pub const NOT_IN_DATABASE: &str = "That information is not in my database.";

#[derive(Deserialize)]
struct KnowledgeArgs {
    query: String,
}

/// `knowledge_base_tool`: answers a question from a collection
pub struct KnowledgeTool {
    index: Arc<CollectionIndex>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl KnowledgeTool {
    pub fn new(index: Arc<CollectionIndex>, llm: Arc<dyn LlmProvider>, top_k: usize) -> Self {
        Self {
            index,
            llm,
            top_k: top_k.max(1),
        }
    }

    /// Retrieve, prompt and answer; a web source of the matches is linked
    pub async fn answer(&self, question: &str) -> Result<String> {
        let results = self.index.query(question, self.top_k).await?;
        if results.is_empty() {
            tracing::debug!("No matches in '{}' for: {}", self.index.name(), question);
            return Ok(NOT_IN_DATABASE.to_string());
        }

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_qa_prompt(question, &context);
        let mut answer = self.llm.generate(&prompt).await?;

        let link = results
            .iter()
            .filter_map(|r| r.chunk.source())
            .find(|s| s.starts_with("http://") || s.starts_with("https://"));
        if let Some(link) = link {
            answer.push_str(&PromptBuilder::read_more(link));
        }

        Ok(answer)
    }
}

#[async_trait]
impl Tool for KnowledgeTool {
    fn name(&self) -> &str {
        "knowledge_base_tool"
    }

    fn description(&self) -> &str {
        "Answers questions about the company and its website from the indexed pages and \
         documents. Pass the visitor's question as `query`."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The question to answer"}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: KnowledgeArgs = parse_args(self.name(), args)?;
        self.answer(&args.query).await
    }
}
