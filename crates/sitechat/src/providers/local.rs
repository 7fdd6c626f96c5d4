//! Local vector store persisted as JSON inside a collection directory
//!
//! Search is a brute-force cosine scan, which is plenty for a website's worth
//! of pages.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Chunk, ScoredChunk};

use super::vector_store::VectorStoreProvider;

/// File holding the vectors of one collection
pub const VECTORS_FILE: &str = "vectors.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredVectors {
    version: u32,
    chunks: Vec<Chunk>,
}

/// In-memory vectors backed by `<dir>/vectors.json`
pub struct LocalVectorStore {
    path: PathBuf,
    chunks: RwLock<Vec<Chunk>>,
}

impl LocalVectorStore {
    /// Open the store in `dir`, loading persisted vectors if there are any
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(VECTORS_FILE);

        let chunks = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: StoredVectors = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::VectorDb(format!("Corrupt vector file {}: {}", path.display(), e))
                })?;
                if stored.version != FORMAT_VERSION {
                    return Err(Error::VectorDb(format!(
                        "Unsupported vector file version {} in {}",
                        stored.version,
                        path.display()
                    )));
                }
                stored.chunks
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened {} with {} vectors", path.display(), chunks.len());

        Ok(Self {
            path,
            chunks: RwLock::new(chunks),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        let mut stored = self.chunks.write();
        let dimension = stored.first().map(|c| c.embedding.len());

        for chunk in &chunks {
            if chunk.embedding.is_empty() {
                return Err(Error::VectorDb(format!("Chunk {} has no embedding", chunk.id)));
            }
            let expected = dimension.unwrap_or_else(|| chunks[0].embedding.len());
            if chunk.embedding.len() != expected {
                return Err(Error::VectorDb(format!(
                    "Dimension mismatch: expected {}, got {}",
                    expected,
                    chunk.embedding.len()
                )));
            }
        }

        stored.extend(chunks);
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.chunks.read();

        let mut scored: Vec<(usize, f32)> = stored
            .iter()
            .enumerate()
            .map(|(i, c)| (i, cosine_similarity(query_embedding, &c.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(i, score)| ScoredChunk {
                chunk: stored[i].clone(),
                score,
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.chunks.read().len())
    }

    async fn document_count(&self) -> Result<usize> {
        let stored = self.chunks.read();
        Ok(stored.iter().map(|c| c.document_id).collect::<HashSet<_>>().len())
    }

    async fn persist(&self) -> Result<()> {
        let bytes = {
            let stored = self.chunks.read();
            serde_json::to_vec(&StoredVectors {
                version: FORMAT_VERSION,
                chunks: stored.clone(),
            })?
        };

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!("Persisted {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "local-json"
    }
}

/// Cosine similarity; 0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;
    use tempfile::TempDir;

    fn chunk(doc: &Document, text: &str, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(doc, text.to_string(), 0);
        chunk.embedding = embedding;
        chunk
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_and_persist_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        assert!(store.is_empty().await.unwrap());

        let a = Document::new("a");
        let b = Document::new("b");
        store
            .insert_chunks(vec![
                chunk(&a, "widgets", vec![1.0, 0.0]),
                chunk(&a, "gadgets", vec![0.7, 0.7]),
                chunk(&b, "pricing", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "widgets");
        assert_eq!(hits[1].chunk.content, "gadgets");

        store.persist().await.unwrap();
        assert!(dir.path().join(VECTORS_FILE).exists());
        assert!(!dir.path().join("vectors.json.tmp").exists());

        let reopened = LocalVectorStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 3);
        assert_eq!(reopened.document_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rejects_bad_embeddings() {
        let dir = TempDir::new().unwrap();
        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        let doc = Document::new("x");

        let err = store
            .insert_chunks(vec![chunk(&doc, "empty", Vec::new())])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));

        store
            .insert_chunks(vec![chunk(&doc, "ok", vec![1.0, 2.0])])
            .await
            .unwrap();
        let err = store
            .insert_chunks(vec![chunk(&doc, "wide", vec![1.0, 2.0, 3.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(VECTORS_FILE), b"{not json").unwrap();
        assert!(matches!(
            LocalVectorStore::open(dir.path()).await,
            Err(Error::VectorDb(_))
        ));
    }
}
