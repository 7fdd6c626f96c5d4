//! sitechat: website chatbot backend
//!
//! Indexes web pages and documents into per-collection vector stores,
//! answers visitor questions through a tool-calling LLM agent, and runs a
//! small "download a guide" workflow that fills in a marketing form and
//! submits the lead.

pub mod agent;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod storage;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{AgentBuilder, ChatAgent, ToolCallingAgent};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use storage::{CollectionIndex, CollectionRegistry};
pub use types::{Chunk, Document, FileType};
