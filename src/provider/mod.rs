//! Provider abstraction over LLM backends
//!
//! Two families are supported behind one trait:
//! - cloud chat-completions (OpenAI-compatible; tool arguments arrive as
//!   JSON strings)
//! - self-hosted Ollama chat (tool arguments arrive pre-parsed)
//!
//! Adapters normalize both into `ProviderReply` with `ToolCallRequest`s,
//! so the orchestration loop never sees raw provider payloads.

mod capabilities;
mod ollama;
mod openai;

pub use capabilities::model_supports_tools;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One turn in a conversation, in normalized form.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    /// Prose content. None only for assistant turns that carry tool calls
    /// instead of text.
    pub content: Option<String>,
    /// Tool calls requested by an assistant turn, in provider order.
    pub tool_calls: Vec<ToolCallRequest>,
    /// For tool turns: which pending call this result answers.
    pub tool_call_id: Option<String>,
    /// For tool turns: the tool that produced the result.
    pub tool_name: Option<String>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn tool_result(call: &ToolCallRequest, output: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(output.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.tool_name.clone()),
        }
    }
}

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool call the model asked for, normalized across providers.
/// Arguments are always a parsed JSON value here, regardless of whether
/// the backend sent them string-encoded.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// Static tool descriptor advertised to the backend.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A fully assembled request for one round.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatTurn>,
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    /// Whether tool schemas should be attached for this request's model.
    /// Evaluated fresh per request so model switches take effect
    /// immediately.
    pub fn tools_enabled(&self) -> bool {
        !self.tools.is_empty() && model_supports_tools(&self.model)
    }
}

/// Normalized provider response for one round: prose plus any requested
/// tool calls, in the order the backend listed them.
#[derive(Debug, Clone, Default)]
pub struct ProviderReply {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

/// Unified provider trait for LLM backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name for logging
    fn name(&self) -> &'static str;

    /// Run one blocking chat round.
    async fn chat(&self, request: ChatRequest) -> Result<ProviderReply>;

    /// Models this backend offers. Never fails: backends without a
    /// listing endpoint (or with the endpoint unreachable) return a
    /// fixed fallback list.
    async fn list_models(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tools_enabled_follows_model() {
        let tool = ToolDefinition {
            name: "find_by_party".into(),
            description: "".into(),
            parameters: json!({}),
        };

        let mut request = ChatRequest {
            model: "gpt-4o-mini".into(),
            system: None,
            messages: vec![],
            tools: vec![tool],
        };
        assert!(request.tools_enabled());

        request.model = "o1-mini".into();
        assert!(!request.tools_enabled());

        // No schemas means nothing to attach regardless of model
        request.model = "gpt-4o-mini".into();
        request.tools = vec![];
        assert!(!request.tools_enabled());
    }

    #[test]
    fn test_tool_result_pairs_with_call() {
        let call = ToolCallRequest {
            id: "call_1".into(),
            tool_name: "find_by_party".into(),
            arguments: json!({"party": "alice@example.com"}),
        };
        let turn = ChatTurn::tool_result(&call, "[]");
        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(turn.tool_name.as_deref(), Some("find_by_party"));
    }
}
