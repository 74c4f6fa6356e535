//! Conversation state for one session
//!
//! Owns the ordered message history (append-only from the loop's point of
//! view; truncated only by an explicit clear), the system prompt, and the
//! per-turn set of already-executed call fingerprints. The system prompt,
//! when non-empty, always leads any request built for a provider.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use crate::provider::{ChatRequest, ChatTurn, ProviderReply, Role, ToolCallRequest, ToolDefinition};

/// Session state for a single conversation
pub struct ConversationSession {
    system_prompt: String,
    history: Vec<ChatTurn>,
    /// Fingerprints of calls already executed during the current
    /// user-turn resolution. Reset at the start of every turn.
    seen_calls: HashSet<String>,
}

impl ConversationSession {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            history: Vec::new(),
            seen_calls: HashSet::new(),
        }
    }

    /// Start resolving a new user message: forget the previous turn's
    /// executed-call fingerprints.
    pub fn begin_turn(&mut self) {
        self.seen_calls.clear();
    }

    /// Record a fingerprint; returns false if the identical call was
    /// already executed this turn.
    pub fn mark_seen(&mut self, fp: String) -> bool {
        self.seen_calls.insert(fp)
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn::user(content));
    }

    /// Append an assistant reply, including its raw tool-call requests so
    /// later rounds can pair results to them.
    pub fn push_assistant(&mut self, reply: &ProviderReply) {
        let content = if reply.text.is_empty() {
            None
        } else {
            Some(reply.text.clone())
        };
        self.history
            .push(ChatTurn::assistant(content, reply.tool_calls.clone()));
    }

    pub fn push_tool_result(&mut self, call: &ToolCallRequest, output: impl Into<String>) {
        self.history.push(ChatTurn::tool_result(call, output));
    }

    /// Build a provider request from the full stored history. Capability
    /// filtering happens inside the adapter; the stored history is never
    /// mutated for a particular provider.
    pub fn build_request(&self, model: &str, tools: &[ToolDefinition]) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            system: if self.system_prompt.is_empty() {
                None
            } else {
                Some(self.system_prompt.clone())
            },
            messages: self.history.clone(),
            tools: tools.to_vec(),
        }
    }

    /// User-initiated reset. Drops history and the per-turn state; the
    /// system prompt stays.
    pub fn clear(&mut self) {
        self.history.clear();
        self.seen_calls.clear();
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// The user-visible transcript: tool turns and empty assistant stubs
    /// are internal plumbing and are not rendered.
    pub fn transcript(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.history.iter().filter_map(|turn| match turn.role {
            Role::Tool => None,
            _ => turn
                .content
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(|c| (turn.role.as_str(), c)),
        })
    }
}

/// Canonical fingerprint of a tool call: SHA-256 over the tool name and
/// its arguments with all object keys sorted, so argument order in the
/// provider payload does not defeat de-duplication.
pub fn fingerprint(tool_name: &str, arguments: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update(b"\0");
    hasher.update(canonicalize(arguments).as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn canonicalize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let fields: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", k, canonicalize(v)))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}
