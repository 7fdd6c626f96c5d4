//! Application state for the chatbot server

use parking_lot::RwLock;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentBuilder, ChatAgent};
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::{DocumentLoader, SitemapLoader};
use crate::providers::{EmbeddingProvider, LlmProvider, OpenAiClient};
use crate::storage::CollectionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Collections opened by this process
    registry: CollectionRegistry,
    /// Chat model for the agent and the knowledge tool
    llm: Arc<dyn LlmProvider>,
    /// Client for crawling and the agent's web tools
    http_client: Client,
    /// Sitemap crawler
    sitemap_loader: SitemapLoader,
    /// Agent wired by the last successful `/initialize`
    agent: RwLock<Option<Arc<dyn ChatAgent>>>,
}

impl AppState {
    /// Create state backed by the OpenAI API
    pub fn new(config: RagConfig) -> Result<Self> {
        let openai = Arc::new(OpenAiClient::new(&config.llm, &config.embeddings)?);
        tracing::info!(
            "OpenAI client ready (chat: {}, embeddings: {})",
            config.llm.chat_model,
            config.embeddings.model
        );

        Self::with_providers(config, openai.clone(), openai)
    }

    /// Create state with explicit providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .user_agent(config.ingestion.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let loader = DocumentLoader::new(&config.ingestion.data_dir, config.ingestion.recursive);
        let registry = CollectionRegistry::new(
            &config.storage.storage_root,
            loader,
            embedder,
            config.chunking.clone(),
        );
        let sitemap_loader =
            SitemapLoader::new(http_client.clone(), config.ingestion.crawl_concurrency);

        tracing::info!(
            "Collections stored under {}",
            config.storage.storage_root.display()
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                registry,
                llm,
                http_client,
                sitemap_loader,
                agent: RwLock::new(None),
            }),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.inner.registry
    }

    /// Load or build a collection and make an agent over it the active one.
    ///
    /// Returns the status line reported to the caller.
    pub async fn initialize(&self, collection_name: &str) -> Result<String> {
        let index = self.inner.registry.get_or_create(collection_name).await?;

        let agent = AgentBuilder::for_collection(
            Arc::clone(&index),
            Arc::clone(&self.inner.llm),
            self.inner.http_client.clone(),
            &self.inner.config,
        )
        .build();
        *self.inner.agent.write() = Some(Arc::new(agent));

        tracing::info!(
            "Agent ready over collection '{}' ({})",
            collection_name,
            index.state().as_str()
        );

        Ok(format!(
            "Collection '{}' {} and agent ready",
            collection_name,
            index.state().as_str()
        ))
    }

    /// Crawl a sitemap into an initialized collection; returns pages added
    pub async fn update_from_sitemap(
        &self,
        sitemap_url: &str,
        domain: &str,
        collection_name: &str,
    ) -> Result<usize> {
        let index = self.inner.registry.get(collection_name)?;

        let documents = self.inner.sitemap_loader.load(sitemap_url, domain).await?;
        let pages = documents.len();
        let chunks = index.insert(documents).await?;

        tracing::info!(
            "Sitemap {} added {} pages ({} chunks) to '{}'",
            sitemap_url,
            pages,
            chunks,
            collection_name
        );
        Ok(pages)
    }

    /// Agent wired by the last `/initialize`
    pub fn active_agent(&self) -> Result<Arc<dyn ChatAgent>> {
        self.inner
            .agent
            .read()
            .clone()
            .ok_or_else(|| Error::NotInitialized("Agent".to_string()))
    }

    /// Replace the active agent
    #[cfg(test)]
    pub(crate) fn set_agent(&self, agent: Arc<dyn ChatAgent>) {
        *self.inner.agent.write() = Some(agent);
    }
}
