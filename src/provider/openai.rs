//! Cloud provider adapter (OpenAI-compatible Chat Completions API)
//!
//! Request shape: `{model, messages[], tools?[]}` against a completions
//! endpoint. Tool-call arguments come back as JSON *strings* and are
//! parsed here so the loop only ever sees normalized values.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ChatRequest, Provider, ProviderReply, Role, ToolCallRequest};
use crate::error::ProviderError;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Models offered when the caller asks for a listing; the cloud side has
/// no tag endpoint worth querying per keystroke.
const KNOWN_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"];

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: HttpClient::new(),
            api_key,
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Point the adapter at a compatible gateway instead of api.openai.com
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Build the wire message list from a normalized request.
    ///
    /// When the model takes no tool schemas, tool-role turns and
    /// assistant tool-call stubs are dropped from this request only; the
    /// stored history keeps them.
    fn build_messages(request: &ChatRequest, tools_enabled: bool) -> Vec<WireMessage> {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            if !system.is_empty() {
                messages.push(WireMessage {
                    role: "system".into(),
                    content: Some(system.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                });
            }
        }

        for turn in &request.messages {
            match turn.role {
                Role::Tool if !tools_enabled => continue,
                Role::Tool => messages.push(WireMessage {
                    role: "tool".into(),
                    content: turn.content.clone(),
                    tool_calls: None,
                    tool_call_id: turn.tool_call_id.clone(),
                }),
                Role::Assistant => {
                    let tool_calls = if tools_enabled && !turn.tool_calls.is_empty() {
                        Some(
                            turn.tool_calls
                                .iter()
                                .map(|c| WireToolCall {
                                    id: c.id.clone(),
                                    call_type: "function".into(),
                                    function: WireFunctionCall {
                                        name: c.tool_name.clone(),
                                        arguments: c.arguments.to_string(),
                                    },
                                })
                                .collect(),
                        )
                    } else {
                        None
                    };

                    // An assistant turn that only carried (now-dropped)
                    // tool calls has nothing left to say.
                    if tool_calls.is_none() && turn.content.as_deref().unwrap_or("").is_empty() {
                        continue;
                    }

                    messages.push(WireMessage {
                        role: "assistant".into(),
                        content: turn.content.clone(),
                        tool_calls,
                        tool_call_id: None,
                    });
                }
                _ => messages.push(WireMessage {
                    role: turn.role.as_str().into(),
                    content: turn.content.clone(),
                    tool_calls: None,
                    tool_call_id: None,
                }),
            }
        }

        messages
    }

    /// Convert tool definitions to the wire schema shape
    fn convert_tools(request: &ChatRequest) -> Vec<WireTool> {
        request
            .tools
            .iter()
            .map(|t| WireTool {
                tool_type: "function".into(),
                function: WireFunction {
                    name: t.name.clone(),
                    description: Some(t.description.clone()),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderReply> {
        let tools_enabled = request.tools_enabled();
        let messages = Self::build_messages(&request, tools_enabled);
        let tools = if tools_enabled {
            Some(Self::convert_tools(&request))
        } else {
            None
        };

        let body = CompletionRequest {
            model: request.model.clone(),
            messages,
            tools,
            stream: false,
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable {
                provider: "openai",
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {})", e));
            return Err(ProviderError::Api {
                provider: "openai",
                status,
                body,
            }
            .into());
        }

        let result: CompletionResponse =
            response.json().await.map_err(|e| ProviderError::Malformed {
                provider: "openai",
                reason: e.to_string(),
            })?;
        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed {
                provider: "openai",
                reason: "no choices in response".into(),
            })?;

        let text = choice.message.content.unwrap_or_default();

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // Arguments are a JSON string in this family; parse once
                // here. A malformed blob becomes an empty object so the
                // dispatcher can reject it with a readable error.
                let arguments = serde_json::from_str(&tc.function.arguments).unwrap_or_else(|e| {
                    warn!(
                        "Unparsable arguments for {} ({}): {}",
                        tc.function.name, tc.id, e
                    );
                    serde_json::json!({})
                });
                ToolCallRequest {
                    id: tc.id,
                    tool_name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        Ok(ProviderReply { text, tool_calls })
    }

    async fn list_models(&self) -> Vec<String> {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    }
}

// ============================================================================
// Wire types (OpenAI-compatible Chat Completions format)
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded string, per this API family
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}
