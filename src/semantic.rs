//! Semantic search over vCon embeddings
//!
//! Embeds query text via the OpenAI embeddings API and runs approximate
//! nearest-neighbor search against the Qdrant collection the ingest
//! pipeline populated. Degrades gracefully: when Qdrant or the API key is
//! missing, `is_available()` is false and the search tool reports that to
//! the model instead of failing the turn.

use anyhow::{Context, Result};
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, SearchParams, SearchPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeouts for external API calls
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const EMBED_RETRY_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Embedding dimensions for text-embedding-ada-002
const EMBEDDING_DIM: u64 = 1536;

/// Fixed index tuning: neighbor-probe breadth for ANN search.
/// Not exposed to callers.
const SEARCH_HNSW_EF: u64 = 10;

/// One nearest-neighbor hit from the vector index.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub vcon_uuid: String,
    pub party_id: String,
    pub text: String,
}

/// Semantic search client
pub struct SemanticSearch {
    qdrant: Option<Qdrant>,
    openai_key: Option<String>,
    embedding_model: String,
    collection: String,
    http_client: reqwest::Client,
}

impl SemanticSearch {
    /// Create a new semantic search client
    pub async fn new(
        qdrant_url: Option<&str>,
        openai_key: Option<String>,
        embedding_model: String,
        collection: String,
    ) -> Self {
        let qdrant = if let Some(url) = qdrant_url {
            match Qdrant::from_url(url).skip_compatibility_check().build() {
                Ok(client) => {
                    info!("Connected to Qdrant at {}", url);
                    Some(client)
                }
                Err(e) => {
                    warn!("Failed to connect to Qdrant: {} - semantic search disabled", e);
                    None
                }
            }
        } else {
            debug!("No Qdrant URL configured");
            None
        };

        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            qdrant,
            openai_key,
            embedding_model,
            collection,
            http_client,
        }
    }

    /// Check if semantic search is available
    pub fn is_available(&self) -> bool {
        self.qdrant.is_some() && self.openai_key.is_some()
    }

    /// Ensure the vCon collection exists
    pub async fn ensure_collection(&self) -> Result<()> {
        let qdrant = self
            .qdrant
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Qdrant not available"))?;

        let exists = qdrant.collection_exists(&self.collection).await?;
        if !exists {
            info!("Creating Qdrant collection: {}", self.collection);
            qdrant
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(EMBEDDING_DIM, Distance::Euclid)),
                )
                .await
                .context(format!("Failed to create collection: {}", self.collection))?;
        }
        Ok(())
    }

    /// Get embedding for text using the OpenAI embeddings API
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self
            .openai_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("OpenAI API key not configured"))?;

        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": text,
        });

        let mut last_error = None;
        for attempt in 0..=EMBED_RETRY_ATTEMPTS {
            if attempt > 0 {
                debug!("Retrying embed (attempt {})", attempt + 1);
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let result = self
                .http_client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let json: serde_json::Value = match response.json().await {
                        Ok(j) => j,
                        Err(e) => {
                            last_error = Some(anyhow::anyhow!("Failed to parse response: {}", e));
                            continue;
                        }
                    };

                    if let Some(error) = json.get("error") {
                        let error_str = error.to_string();
                        if error_str.contains("invalid_api_key") || error_str.contains("quota") {
                            anyhow::bail!("Embeddings API error: {}", error);
                        }
                        last_error = Some(anyhow::anyhow!("Embeddings API error: {}", error));
                        continue;
                    }

                    let embedding = json["data"][0]["embedding"]
                        .as_array()
                        .ok_or_else(|| anyhow::anyhow!("Invalid embedding response"))?
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();

                    return Ok(embedding);
                }
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Request failed: {}", e));
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }

    /// Search the vCon collection for content similar to the query
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let qdrant = self
            .qdrant
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Qdrant not available"))?;

        // Get query embedding
        let embedding = self.embed(query).await?;

        let search = SearchPointsBuilder::new(&self.collection, embedding, limit as u64)
            .with_payload(true)
            .params(SearchParams {
                hnsw_ef: Some(SEARCH_HNSW_EF),
                ..Default::default()
            });

        let results = qdrant
            .search_points(search)
            .await
            .context("Vector search failed")?;

        let hits: Vec<SearchHit> = results
            .result
            .into_iter()
            .map(|point| {
                let id = point
                    .id
                    .as_ref()
                    .and_then(|p| p.point_id_options.as_ref())
                    .map(|opts| match opts {
                        qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
                        qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u) => u.clone(),
                    })
                    .unwrap_or_else(|| "unknown".to_string());

                let get_str = |key: &str| -> Option<String> {
                    let value = point.payload.get(key)?;
                    let s = value.as_str()?;
                    Some(s.to_string())
                };

                SearchHit {
                    id,
                    score: point.score,
                    vcon_uuid: get_str("vcon_uuid").unwrap_or_else(|| "Unknown".to_string()),
                    party_id: get_str("party_id").unwrap_or_else(|| "N/A".to_string()),
                    text: get_str("text").unwrap_or_default(),
                }
            })
            .collect();

        debug!("Vector search returned {} hits", hits.len());
        Ok(hits)
    }
}
