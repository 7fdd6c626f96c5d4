//! Provider abstractions for embeddings, chat models and vector storage
//!
//! The rest of the crate only talks to these traits; `OpenAiClient` and
//! `LocalVectorStore` are the production implementations.

pub mod embedding;
pub mod llm;
pub mod local;
pub mod openai;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatMessage, LlmProvider, Role, ToolCall, ToolSpec};
pub use local::LocalVectorStore;
pub use openai::OpenAiClient;
pub use vector_store::VectorStoreProvider;
