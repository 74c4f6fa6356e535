//! find_by_party - vCon lookup by participant identity

use serde::Deserialize;
use tracing::debug;

use crate::error::ToolError;
use crate::store::VconStore;

const TOOL: &str = "find_by_party";

/// Scheme prefixes the model (or user) may include on an identity.
const SCHEME_PREFIXES: &[&str] = &["tel:", "mailto:", "name:"];

#[derive(Debug, Deserialize)]
pub struct PartyArgs {
    pub party: String,
}

/// Strip a well-known scheme prefix, if present, so `tel:+15551234567`
/// matches the same records as the bare number.
fn normalize_party(party: &str) -> &str {
    let party = party.trim();
    for prefix in SCHEME_PREFIXES {
        if let Some(stripped) = party.strip_prefix(prefix) {
            return stripped;
        }
    }
    party
}

pub async fn execute(args: PartyArgs, store: &VconStore<'_>) -> Result<String, ToolError> {
    let party = normalize_party(&args.party);
    if party.is_empty() {
        return Err(ToolError::invalid(TOOL, "party must not be empty"));
    }

    let uuids = store
        .find_by_party(party)
        .await
        .map_err(|e| ToolError::execution(TOOL, e))?;

    debug!("{}: {} match(es) for {}", TOOL, uuids.len(), party);
    serde_json::to_string(&uuids).map_err(|e| ToolError::execution(TOOL, e.into()))
}
