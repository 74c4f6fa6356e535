//! Retrieval tools, their schemas, and the dispatcher
//!
//! Four read-only query tools over the vCon store:
//! - find_by_party (identity lookup)
//! - find_by_date_range (creation-window lookup)
//! - get_conversation_by_id (full record fetch)
//! - search_in_milvus (vector similarity)
//!
//! Arguments are validated and deserialized into typed structs once,
//! here at the dispatcher boundary; tool bodies never see raw JSON.
//! Unknown tools and bad arguments surface as `ToolError`s that the
//! orchestrator renders into tool-result strings, never turn failures.

mod conversation;
mod date_range;
mod definitions;
mod party;
mod search;

pub use definitions::{get_tools, MAX_UUIDS_PER_LOOKUP};

use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::ToolError;
use crate::provider::{ToolCallRequest, ToolDefinition};
use crate::semantic::SemanticSearch;
use crate::store::VconStore;

use conversation::ByIdArgs;
use date_range::DateRangeArgs;
use party::PartyArgs;
use search::SearchArgs;

/// Borrowed backends handed to each tool execution. Tools never own,
/// close, or reconfigure these.
pub struct ToolDeps<'a> {
    pub db: &'a SqlitePool,
    pub semantic: &'a SemanticSearch,
    /// Top-K for semantic search.
    pub search_limit: usize,
}

/// A tool call resolved against a schema: typed arguments, ready to run.
#[derive(Debug)]
enum ToolInvocation {
    FindByParty(PartyArgs),
    FindByDateRange(DateRangeArgs),
    GetConversationById(ByIdArgs),
    SearchInMilvus(SearchArgs),
}

impl ToolInvocation {
    /// Validate and deserialize arguments for a named tool.
    fn parse(tool_name: &str, arguments: &Value) -> Result<Self, ToolError> {
        fn args<T: serde::de::DeserializeOwned>(
            tool: &str,
            arguments: &Value,
        ) -> Result<T, ToolError> {
            serde_json::from_value(arguments.clone())
                .map_err(|e| ToolError::invalid(tool, e.to_string()))
        }

        match tool_name {
            "find_by_party" => Ok(Self::FindByParty(args(tool_name, arguments)?)),
            "find_by_date_range" => Ok(Self::FindByDateRange(args(tool_name, arguments)?)),
            "get_conversation_by_id" => Ok(Self::GetConversationById(args(tool_name, arguments)?)),
            "search_in_milvus" => Ok(Self::SearchInMilvus(args(tool_name, arguments)?)),
            _ => Err(ToolError::UnknownTool(tool_name.to_string())),
        }
    }
}

/// Registry of retrieval tools: the schema set advertised to providers
/// plus dispatch of incoming call requests.
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            definitions: definitions::get_tools(),
        }
    }

    /// Schemas to advertise on every provider request (the adapter still
    /// applies its own capability filtering).
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Execute one tool call against the supplied backends.
    pub async fn execute(
        &self,
        call: &ToolCallRequest,
        deps: &ToolDeps<'_>,
    ) -> Result<String, ToolError> {
        let invocation = ToolInvocation::parse(&call.tool_name, &call.arguments)?;
        let store = VconStore::new(deps.db);

        match invocation {
            ToolInvocation::FindByParty(args) => party::execute(args, &store).await,
            ToolInvocation::FindByDateRange(args) => date_range::execute(args, &store).await,
            ToolInvocation::GetConversationById(args) => conversation::execute(args, &store).await,
            ToolInvocation::SearchInMilvus(args) => {
                search::execute(args, deps.semantic, deps.search_limit).await
            }
        }
    }
}

/// Generate a human-readable summary for a tool call (REPL display)
pub fn tool_summary(name: &str, args: &Value) -> String {
    fn truncate(s: &str, max_len: usize) -> String {
        if s.len() <= max_len {
            s.to_string()
        } else {
            format!("{}...", &s[..max_len.saturating_sub(3)])
        }
    }

    fn get_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
        args.get(key).and_then(|v| v.as_str())
    }

    match name {
        "find_by_party" => {
            let party = get_str(args, "party").unwrap_or("?");
            format!("Finding vCons for {}", truncate(party, 40))
        }
        "find_by_date_range" => {
            let start = get_str(args, "start_date").unwrap_or("?");
            let end = get_str(args, "end_date").unwrap_or("?");
            format!("Finding vCons from {} to {}", start, end)
        }
        "get_conversation_by_id" => "Fetching vCons by uuid".to_string(),
        "search_in_milvus" => {
            let query = get_str(args, "search_text").unwrap_or("");
            format!("Searching for \"{}\"", truncate(query, 40))
        }
        _ => name.to_string(),
    }
}
