//! Error taxonomy for tool dispatch and provider transport
//!
//! Tool-level failures never abort a turn: the orchestrator converts them
//! to tool-result strings so the model can see what went wrong and adapt.
//! Only provider transport failures propagate out of the loop.

use thiserror::Error;

/// Errors raised while resolving or executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments failed validation against the tool's schema.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The backing store or embedding service failed mid-call.
    #[error("{tool} failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    /// A required backend (vector index, embedding key) is not configured.
    #[error("{0} is unavailable: {1}")]
    Unavailable(&'static str, String),
}

impl ToolError {
    pub fn invalid(tool: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }

    pub fn execution(tool: &str, source: anyhow::Error) -> Self {
        Self::Execution {
            tool: tool.to_string(),
            source,
        }
    }
}

/// Errors talking to an LLM backend. Fatal for the current turn only;
/// conversation state is preserved so the user can retry.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is unreachable: {source}")]
    Unreachable {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unparsable response: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },
}
