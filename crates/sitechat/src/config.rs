//! Configuration for the chatbot backend
//!
//! Defaults can be overridden by a TOML file (path in `SITECHAT_CONFIG`) and
//! then by environment variables, which may come from a `.env` file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI-compatible LLM configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Vector store persistence
    pub storage: StorageConfig,
    /// Local files and sitemap crawling
    pub ingestion: IngestionConfig,
    /// Agent loop configuration
    pub agent: AgentConfig,
    /// Marketing-automation lead endpoint
    pub lead: LeadConfig,
    /// Outbound HTTP used by tools and the crawler
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// LLM configuration (OpenAI chat completions API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// API key, normally taken from `OPENAI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Chat model name
    pub chat_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: String,
    /// Inputs sent per embeddings request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-large".to_string(),
            batch_size: 64,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in bytes
    pub chunk_size: usize,
    /// Overlap between chunks in bytes
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 20,
            min_chunk_size: 1,
        }
    }
}

/// Vector store persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; each collection gets `storage_root/<collection_name>`
    pub storage_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("storage"),
        }
    }
}

/// Document loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Base directory for local source files; a collection's sources live in
    /// `data_dir/<collection_name>`
    pub data_dir: PathBuf,
    /// Descend into sub-directories when loading a whole directory
    pub recursive: bool,
    /// Pages fetched concurrently while crawling a sitemap
    pub crawl_concurrency: usize,
    /// User agent sent by the crawler and the web tools
    pub user_agent: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            recursive: false,
            crawl_concurrency: 4,
            user_agent: format!("sitechat/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model round-trips allowed per user message
    pub max_iterations: usize,
    /// Conversation messages remembered between turns
    pub memory_messages: usize,
    /// Conversations remembered at once
    pub max_sessions: usize,
    /// Chunks retrieved by the knowledge base tool
    pub top_k: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            memory_messages: 40,
            max_sessions: 1024,
            top_k: 2,
        }
    }
}

/// Marketing-automation (SharpSpring) configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadConfig {
    /// Form postback base URL; the embed code is appended to it
    pub endpoint: String,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl RagConfig {
    /// Load configuration from defaults, optional TOML file and environment
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let mut config = match std::env::var("SITECHAT_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(endpoint) = get("SHARPSPRING_ENDPOINT") {
            self.lead.endpoint = endpoint;
        }
        if let Some(host) = get("SITECHAT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("SITECHAT_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid SITECHAT_PORT '{}'", port),
            }
        }
        if let Some(dir) = get("SITECHAT_STORAGE_DIR") {
            self.storage.storage_root = PathBuf::from(dir);
        }
        if let Some(dir) = get("SITECHAT_DATA_DIR") {
            self.ingestion.data_dir = PathBuf::from(dir);
        }
    }

    /// Check the settings every process needs before serving
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::Config("OPENAI_API_KEY is not set".to_string()));
        }
        if self.lead.endpoint.trim().is_empty() {
            return Err(Error::Config("SHARPSPRING_ENDPOINT is not set".to_string()));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
        }
        if self.agent.max_iterations == 0 {
            return Err(Error::Config("agent.max_iterations must be positive".to_string()));
        }
        Ok(())
    }
}
