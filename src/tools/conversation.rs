//! get_conversation_by_id - full vCon fetch by exact UUID
//!
//! Accepts one UUID or a list; the list is hard-capped at
//! `MAX_UUIDS_PER_LOOKUP` entries before any query runs, independent of
//! the `max_results` truncation applied to the returned records.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::definitions::MAX_UUIDS_PER_LOOKUP;
use crate::error::ToolError;
use crate::store::VconStore;

const TOOL: &str = "get_conversation_by_id";

#[derive(Debug, Deserialize)]
pub struct ByIdArgs {
    pub uuids: UuidInput,
    pub max_results: Option<usize>,
}

/// The model may send a single identifier or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UuidInput {
    One(String),
    Many(Vec<String>),
}

impl UuidInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            UuidInput::One(uuid) => vec![uuid],
            UuidInput::Many(uuids) => uuids,
        }
    }
}

/// One record as returned to the model.
#[derive(Debug, Serialize)]
struct ConversationResult {
    uuid: String,
    created_at: String,
    subject: Option<String>,
    document: serde_json::Value,
}

pub async fn execute(args: ByIdArgs, store: &VconStore<'_>) -> Result<String, ToolError> {
    let mut uuids = args.uuids.into_vec();
    if uuids.len() > MAX_UUIDS_PER_LOOKUP {
        warn!(
            "{}: {} uuids requested, dropping all but the first {}",
            TOOL,
            uuids.len(),
            MAX_UUIDS_PER_LOOKUP
        );
        uuids.truncate(MAX_UUIDS_PER_LOOKUP);
    }

    let mut records = Vec::new();
    for uuid in &uuids {
        let found = store
            .fetch_by_uuid(uuid)
            .await
            .map_err(|e| ToolError::execution(TOOL, e))?;
        if let Some(record) = found {
            records.push(ConversationResult {
                uuid: record.uuid,
                created_at: record.created_at.to_rfc3339(),
                subject: record.subject,
                document: record.document,
            });
        }
    }

    if let Some(max) = args.max_results {
        if records.len() > max {
            debug!("{}: truncating {} records to {}", TOOL, records.len(), max);
            records.truncate(max);
        }
    }

    serde_json::to_string_pretty(&records).map_err(|e| ToolError::execution(TOOL, e.into()))
}
