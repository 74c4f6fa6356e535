//! search_in_milvus - semantic search over conversation content
//!
//! The LLM-facing tool name is kept for wire compatibility with the
//! conserver tool contract; the index behind it is whatever
//! `SemanticSearch` is configured against.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;
use crate::semantic::SemanticSearch;

const TOOL: &str = "search_in_milvus";

/// Matched text is clipped to this many characters in results.
const MAX_EXCERPT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub search_text: String,
}

#[derive(Debug, Serialize)]
struct SearchResult {
    id: String,
    score: f32,
    vcon_uuid: String,
    party_id: String,
    text: String,
    truncated: bool,
}

pub async fn execute(
    args: SearchArgs,
    semantic: &SemanticSearch,
    limit: usize,
) -> Result<String, ToolError> {
    if args.search_text.trim().is_empty() {
        return Err(ToolError::invalid(TOOL, "search_text must not be empty"));
    }
    if !semantic.is_available() {
        return Err(ToolError::Unavailable(
            "semantic search",
            "vector index or embedding key not configured".into(),
        ));
    }

    let hits = semantic
        .search(&args.search_text, limit)
        .await
        .map_err(|e| ToolError::execution(TOOL, e))?;

    let results: Vec<SearchResult> = hits
        .into_iter()
        .map(|hit| {
            let truncated = hit.text.chars().count() > MAX_EXCERPT_CHARS;
            let text = if truncated {
                hit.text.chars().take(MAX_EXCERPT_CHARS).collect::<String>() + "..."
            } else {
                hit.text
            };
            SearchResult {
                id: hit.id,
                score: (hit.score * 10_000.0).round() / 10_000.0,
                vcon_uuid: hit.vcon_uuid,
                party_id: hit.party_id,
                text,
                truncated,
            }
        })
        .collect();

    debug!("{}: {} hit(s)", TOOL, results.len());
    serde_json::to_string_pretty(&results).map_err(|e| ToolError::execution(TOOL, e.into()))
}
