//! One collection: a vector store in its own directory plus the embedder
//! and chunker used to fill it

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::ingestion::TextChunker;
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Document, ScoredChunk};

/// How a collection came into memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Vectors were read from the collection directory
    Loaded,
    /// Built from source documents during this process
    FreshlyBuilt,
}

impl IndexState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::FreshlyBuilt => "created",
        }
    }
}

/// Handle to a collection's vector index
pub struct CollectionIndex {
    name: String,
    path: PathBuf,
    state: IndexState,
    store: Arc<dyn VectorStoreProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    /// Serialises insert + persist
    write_lock: Mutex<()>,
}

impl CollectionIndex {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        state: IndexState,
        store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: TextChunker,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            state,
            store,
            embedder,
            chunker,
            write_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the collection persists into
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    /// Chunk, embed and append documents, then persist.
    ///
    /// Returns the number of chunks added. Documents are never deduplicated:
    /// inserting the same page twice stores it twice.
    pub async fn insert(&self, documents: Vec<Document>) -> Result<usize> {
        let mut chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| self.chunker.chunk_document(doc))
            .collect();

        if chunks.is_empty() {
            tracing::debug!(
                "No content to index for collection '{}' ({} documents)",
                self.name,
                documents.len()
            );
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        let _guard = self.write_lock.lock().await;

        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let added = chunks.len();
        self.store.insert_chunks(chunks).await?;
        self.store.persist().await?;

        tracing::info!(
            "Indexed {} documents ({} chunks) into collection '{}'",
            documents.len(),
            added,
            self.name
        );
        Ok(added)
    }

    /// Write the collection to its directory
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.persist().await
    }

    /// The `top_k` chunks most similar to `text`
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if self.store.is_empty().await? || top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(text).await?;
        self.store.search(&embedding, top_k).await
    }

    pub async fn vector_count(&self) -> Result<usize> {
        self.store.len().await
    }

    pub async fn document_count(&self) -> Result<usize> {
        self.store.document_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LocalVectorStore;
    use crate::testing::FakeEmbedder;
    use tempfile::TempDir;

    async fn index_in(dir: &TempDir, embedder: Arc<FakeEmbedder>) -> CollectionIndex {
        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        CollectionIndex::new(
            "faq",
            dir.path(),
            IndexState::FreshlyBuilt,
            Arc::new(store),
            embedder,
            TextChunker::new(1024, 20),
        )
    }

    #[tokio::test]
    async fn test_insert_and_query() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir, Arc::new(FakeEmbedder::default())).await;

        let added = index
            .insert(vec![
                Document::new("Our office is in Sydney near the harbour.")
                    .with_metadata("source", "https://example.com/contact"),
                Document::new("Pricing starts at ten dollars per month.")
                    .with_metadata("source", "https://example.com/pricing"),
            ])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(index.vector_count().await.unwrap(), 2);
        assert_eq!(index.document_count().await.unwrap(), 2);

        let hits = index.query("how much is pricing per month", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source(), Some("https://example.com/pricing"));
    }

    #[tokio::test]
    async fn test_insert_duplicates_and_persists() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir, Arc::new(FakeEmbedder::default())).await;

        let page = Document::new("Same page text.").with_metadata("source", "https://example.com/a");
        index.insert(vec![page.clone()]).await.unwrap();
        index.insert(vec![page]).await.unwrap();
        assert_eq!(index.vector_count().await.unwrap(), 2);

        let reopened = LocalVectorStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_insert_and_query() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(FakeEmbedder::default());
        let index = index_in(&dir, embedder.clone()).await;

        assert_eq!(index.insert(vec![Document::new("  ")]).await.unwrap(), 0);
        assert!(index.query("anything", 2).await.unwrap().is_empty());
        assert_eq!(embedder.calls(), 0);
    }
}
