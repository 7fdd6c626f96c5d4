//! Process-wide map from collection name to its loaded index

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::collection::{CollectionIndex, IndexState};
use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::ingestion::{DocumentLoader, TextChunker};
use crate::providers::{EmbeddingProvider, LocalVectorStore, VectorStoreProvider};
use crate::types::Document;

/// Registry of collections opened by this process.
///
/// Each name maps to a cell that is filled at most once, so concurrent first
/// calls for the same collection build it a single time. A failed build
/// leaves the cell empty and the next call retries.
pub struct CollectionRegistry {
    storage_root: PathBuf,
    loader: DocumentLoader,
    embedder: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    collections: DashMap<String, Arc<OnceCell<Arc<CollectionIndex>>>>,
}

impl CollectionRegistry {
    pub fn new(
        storage_root: impl Into<PathBuf>,
        loader: DocumentLoader,
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            storage_root: storage_root.into(),
            loader,
            embedder,
            chunking,
            collections: DashMap::new(),
        }
    }

    /// Return the collection's index, loading it from disk or building it
    /// from its source documents on first use.
    pub async fn get_or_create(&self, name: &str) -> Result<Arc<CollectionIndex>> {
        validate_name(name)?;

        let cell = self.collections.entry(name.to_string()).or_default().clone();

        cell.get_or_try_init(|| self.open_or_build(name))
            .await
            .cloned()
    }

    /// Index of a collection that has already been through `get_or_create`
    pub fn get(&self, name: &str) -> Result<Arc<CollectionIndex>> {
        self.collections
            .get(name)
            .and_then(|entry| entry.value().get().cloned())
            .ok_or_else(|| Error::NotInitialized(format!("Collection '{}'", name)))
    }

    /// Add documents to an initialized collection; returns chunks added
    pub async fn insert(&self, name: &str, documents: Vec<Document>) -> Result<usize> {
        self.get(name)?.insert(documents).await
    }

    /// Names of the collections loaded so far
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    async fn open_or_build(&self, name: &str) -> Result<Arc<CollectionIndex>> {
        let path = self.storage_root.join(name);
        tokio::fs::create_dir_all(&path).await?;

        let store = Arc::new(LocalVectorStore::open(&path).await?);
        let chunker = TextChunker::new(self.chunking.chunk_size, self.chunking.chunk_overlap)
            .with_min_size(self.chunking.min_chunk_size);

        if !store.is_empty().await? {
            let vectors = store.len().await?;
            tracing::info!(
                "Loaded collection '{}' from {} ({} vectors)",
                name,
                path.display(),
                vectors
            );
            return Ok(Arc::new(CollectionIndex::new(
                name,
                path,
                IndexState::Loaded,
                store,
                self.embedder.clone(),
                chunker,
            )));
        }

        let index = CollectionIndex::new(
            name,
            path,
            IndexState::FreshlyBuilt,
            store,
            self.embedder.clone(),
            chunker,
        );

        let loader = self.loader.clone();
        let collection = name.to_string();
        let documents =
            tokio::task::spawn_blocking(move || loader.load_collection_sources(&collection))
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        let chunks = index.insert(documents).await?;
        index.persist().await?;

        tracing::info!(
            "Built collection '{}' in {} ({} chunks)",
            name,
            index.path().display(),
            chunks
        );
        Ok(Arc::new(index))
    }
}

/// Collection names become directory names, so keep them to one path segment
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Collection name not provided"));
    }
    if trimmed != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(Error::validation(format!("Invalid collection name '{}'", name)));
    }
    Ok(())
}
