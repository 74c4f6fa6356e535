//! vcon-chat - chat with a vCon conversation store
//!
//! An interactive assistant that answers questions about stored vCons by
//! letting the model call retrieval tools:
//! - party / date-range / uuid lookup against SQLite
//! - semantic search against a vector index
//!
//! Backends: OpenAI-compatible chat completions (cloud) or Ollama
//! (self-hosted), selected at startup.

use anyhow::Result;
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use vcon_chat::config::Config;
use vcon_chat::provider::{OllamaProvider, OpenAiProvider, Provider};
use vcon_chat::repl::Repl;
use vcon_chat::semantic::SemanticSearch;
use vcon_chat::store;

#[derive(Parser)]
#[command(name = "vcon-chat")]
#[command(about = "Chat with a vCon conversation store through LLM tool calling")]
struct Args {
    /// Model to chat with (defaults per backend)
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Use the self-hosted Ollama backend even if an OpenAI key is set
    #[arg(long)]
    ollama: bool,

    /// Database URL for the vCon store
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Qdrant URL for the vector index
    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    /// OpenAI API key (chat + embeddings)
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,

    /// Ollama host
    #[arg(long, env = "OLLAMA_HOST")]
    ollama_host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = Config::load();

    // Resolve values: CLI args > env vars (handled by clap) > config file > defaults
    let api_key = args.openai_api_key.or_else(|| config.openai_api_key());
    let database_url = args.database_url.unwrap_or_else(|| config.database_url());
    let qdrant_url = args.qdrant_url.unwrap_or_else(|| config.qdrant_url());
    let ollama_host = args.ollama_host.unwrap_or_else(|| config.ollama_host());

    // Connect to the vCon store
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    store::ensure_schema(&db).await?;
    info!("Connected to vCon store at {}", database_url);

    // Semantic search degrades gracefully when Qdrant or the key is absent
    let semantic = SemanticSearch::new(
        Some(&qdrant_url),
        api_key.clone(),
        config.embedding_model(),
        config.vector_collection(),
    )
    .await;
    if semantic.is_available() {
        if let Err(e) = semantic.ensure_collection().await {
            warn!("Vector collection unavailable: {}", e);
        }
    } else {
        warn!("Semantic search disabled (needs Qdrant and an OpenAI key)");
    }

    // Pick the backend: cloud when a key is present, unless --ollama
    let (provider, model): (Box<dyn Provider>, String) = match api_key {
        Some(key) if !args.ollama => {
            let model = args.model.unwrap_or_else(|| config.default_openai_model());
            (Box::new(OpenAiProvider::new(key)), model)
        }
        _ => {
            let model = args.model.unwrap_or_else(|| config.default_model());
            (Box::new(OllamaProvider::new(ollama_host)), model)
        }
    };
    info!("Using {} backend with model {}", provider.name(), model);

    let mut repl = Repl::new(provider, model, db, semantic, config.search_result_limit())?;
    repl.run().await
}
