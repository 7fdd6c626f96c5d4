//! Chatbot server binary
//!
//! Run with: cargo run -p sitechat --bin sitechat-server

use sitechat::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitechat=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = RagConfig::load()?;
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Chat model: {}", config.llm.chat_model);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);
    tracing::info!("  - Storage root: {}", config.storage.storage_root.display());
    tracing::info!("  - Data dir: {}", config.ingestion.data_dir.display());

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("\nEndpoints:");
    println!("  POST /initialize - Load or build a collection and start the agent");
    println!("  PUT  /sitemap    - Crawl a sitemap into a collection");
    println!("  POST /query      - Chat with the agent");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
