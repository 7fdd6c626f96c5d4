//! Prompt templates for the knowledge tool and the website agent

use crate::types::ScoredChunk;

/// Grounding rules appended to every knowledge question
pub const GROUNDING_RULES: &str = "use the data provided in the context only, if the source \
is available, always append the source to the end of answer, if you don't know the answer, \
say it's not in your database";

/// System prompt of the website agent
pub const WEBSITE_AGENT_PROMPT: &str = r#"You are the assistant on a company website. You answer visitors' questions and help them with simple actions on the site.

ANSWERING QUESTIONS:
- Use knowledge_base_tool for every question about the company, its products, services, pricing or content.
- Only answer from what the tool returns. If it says the information is not in the database, tell the visitor so.
- Keep any "If you would like to read more" link the tool gives you at the end of your answer.

DOWNLOADING A GUIDE:
When a visitor wants to download a guide, whitepaper or other gated content from a page:
1. Use tag_exists_tool with tag_name "form" on the page URL to confirm the page has a form.
2. Use fetch_field_tool with input_name "field_" on the same URL to list the fields the form needs.
3. Ask the visitor for every field you found, using the placeholders as labels. Ask for all missing values in one message and wait for the answer.
4. When you have every value, call sharpspring_tool with the form's embedCode and one field_* entry per field.
5. Call http_tool with method GET on the URL sharpspring_tool returned.
6. Tell the visitor whether the submission succeeded.
Never invent field values and never submit a form the visitor has not filled in.

If no page URL is known, ask the visitor which page the guide is on. Do not call http_tool without a URL."#;

/// Prompt builder for knowledge queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate retrieved chunks into a context block
    pub fn build_context(results: &[ScoredChunk]) -> String {
        let mut context = String::new();

        for result in results {
            if let Some(source) = result.chunk.source() {
                context.push_str(&format!("Source: {}\n", source));
            }
            context.push_str(&result.chunk.content);
            context.push_str("\n\n");
        }

        context
    }

    /// Text-QA prompt: context, then the question with the grounding rules
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            "Context information is below.\n\
             ---------------------\n\
             {context}\n\
             ---------------------\n\
             Given the context information answer the following question ({rules}): {question}\n",
            context = context.trim_end(),
            rules = GROUNDING_RULES,
            question = question,
        )
    }

    /// Link appended to an answer whose best match has a web source
    pub fn read_more(source: &str) -> String {
        format!("\n\nIf you would like to read more, here is the link: {}", source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Document, SOURCE_KEY};

    #[test]
    fn test_qa_prompt_layout() {
        let doc = Document::new("x").with_metadata(SOURCE_KEY, "https://example.com/p");
        let results = vec![ScoredChunk {
            chunk: Chunk::new(&doc, "Plans start at $10.".to_string(), 0),
            score: 0.9,
        }];

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_qa_prompt("How much?", &context);

        assert!(prompt.starts_with("Context information is below.\n---------------------\n"));
        assert!(prompt.contains("Source: https://example.com/p\nPlans start at $10."));
        assert!(prompt.contains("say it's not in your database): How much?"));
    }
}
