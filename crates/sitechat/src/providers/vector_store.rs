//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{Chunk, ScoredChunk};

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorStore`: JSON-persisted store in a collection directory
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert chunks; every chunk must carry its embedding
    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<()>;

    /// Search for the `top_k` chunks most similar to `query_embedding`
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Number of distinct documents the stored vectors came from
    async fn document_count(&self) -> Result<usize>;

    /// Write the current contents to durable storage
    async fn persist(&self) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
