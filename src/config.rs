//! Configuration file support for vcon-chat
//!
//! Loads config from ~/.vcon-chat/config.toml, with environment variable
//! fallbacks for every field. This module only reads configuration; it
//! never creates or rewrites the secrets file.

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for vcon-chat
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// OpenAI API key (chat completions + embeddings)
    pub openai_api_key: Option<String>,

    /// Database URL for the vCon store
    pub database_url: Option<String>,

    /// Ollama host for the self-hosted backend
    pub ollama_host: Option<String>,

    /// Default self-hosted model
    pub default_model: Option<String>,

    /// Default cloud model
    pub default_openai_model: Option<String>,

    /// Qdrant URL for the vector index
    pub qdrant_url: Option<String>,

    /// Vector collection holding the vCon embeddings
    pub vector_collection: Option<String>,

    /// Embedding model name
    pub embedding_model: Option<String>,

    /// Top-K for semantic search
    pub search_result_limit: Option<usize>,
}

impl Config {
    /// Load config from ~/.vcon-chat/config.toml
    pub fn load() -> Self {
        let path = config_path();

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Get a value with fallback to environment variable
    pub fn get_or_env(&self, field: Option<&String>, env_var: &str) -> Option<String> {
        field.cloned().or_else(|| std::env::var(env_var).ok())
    }

    // Resolved values with deployment defaults

    pub fn openai_api_key(&self) -> Option<String> {
        self.get_or_env(self.openai_api_key.as_ref(), "OPENAI_API_KEY")
    }

    pub fn database_url(&self) -> String {
        self.get_or_env(self.database_url.as_ref(), "DATABASE_URL")
            .unwrap_or_else(|| "sqlite:vcons.db?mode=rwc".to_string())
    }

    pub fn ollama_host(&self) -> String {
        self.get_or_env(self.ollama_host.as_ref(), "OLLAMA_HOST")
            .unwrap_or_else(|| "http://localhost:11434".to_string())
    }

    pub fn default_model(&self) -> String {
        self.get_or_env(self.default_model.as_ref(), "VCON_CHAT_MODEL")
            .unwrap_or_else(|| "llama3.2:latest".to_string())
    }

    pub fn default_openai_model(&self) -> String {
        self.get_or_env(self.default_openai_model.as_ref(), "VCON_CHAT_OPENAI_MODEL")
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }

    pub fn qdrant_url(&self) -> String {
        self.get_or_env(self.qdrant_url.as_ref(), "QDRANT_URL")
            .unwrap_or_else(|| "http://localhost:6334".to_string())
    }

    pub fn vector_collection(&self) -> String {
        self.get_or_env(self.vector_collection.as_ref(), "VCON_VECTOR_COLLECTION")
            .unwrap_or_else(|| "vcons_collection".to_string())
    }

    pub fn embedding_model(&self) -> String {
        self.get_or_env(self.embedding_model.as_ref(), "VCON_EMBEDDING_MODEL")
            .unwrap_or_else(|| "text-embedding-ada-002".to_string())
    }

    pub fn search_result_limit(&self) -> usize {
        self.search_result_limit
            .or_else(|| {
                std::env::var("VCON_SEARCH_RESULT_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(10)
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".vcon-chat")
        .join("config.toml")
}
