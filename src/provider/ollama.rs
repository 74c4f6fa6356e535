//! Self-hosted provider adapter (Ollama chat API)
//!
//! Same conceptual contract as the cloud family over a different wire
//! shape: `POST /api/chat` with `stream:false`, tool-call arguments
//! arriving *pre-parsed* as JSON objects (no string decoding), and no
//! call identifiers - the adapter synthesizes them so result pairing
//! works identically downstream.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{ChatRequest, Provider, ProviderReply, Role, ToolCallRequest};
use crate::error::ProviderError;

/// Shown when the host has no reachable tag endpoint. Matches the models
/// the original deployment shipped with.
const FALLBACK_MODELS: &[&str] = &["llama3.2:latest", "llama2", "mistral", "codellama"];

/// Ollama chat provider (for local models)
pub struct OllamaProvider {
    client: HttpClient,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_messages(request: &ChatRequest, tools_enabled: bool) -> Vec<WireMessage> {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            if !system.is_empty() {
                messages.push(WireMessage {
                    role: "system".into(),
                    content: system.clone(),
                    tool_calls: None,
                });
            }
        }

        for turn in &request.messages {
            match turn.role {
                Role::Tool if !tools_enabled => continue,
                Role::Tool => messages.push(WireMessage {
                    role: "tool".into(),
                    content: turn.content.clone().unwrap_or_default(),
                    tool_calls: None,
                }),
                Role::Assistant => {
                    let tool_calls = if tools_enabled && !turn.tool_calls.is_empty() {
                        Some(
                            turn.tool_calls
                                .iter()
                                .map(|c| WireToolCall {
                                    function: WireFunctionCall {
                                        name: c.tool_name.clone(),
                                        // Pre-parsed objects on this API
                                        arguments: c.arguments.clone(),
                                    },
                                })
                                .collect(),
                        )
                    } else {
                        None
                    };

                    let content = turn.content.clone().unwrap_or_default();
                    if tool_calls.is_none() && content.is_empty() {
                        continue;
                    }

                    messages.push(WireMessage {
                        role: "assistant".into(),
                        content,
                        tool_calls,
                    });
                }
                _ => messages.push(WireMessage {
                    role: turn.role.as_str().into(),
                    content: turn.content.clone().unwrap_or_default(),
                    tool_calls: None,
                }),
            }
        }

        messages
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderReply> {
        let tools_enabled = request.tools_enabled();
        let messages = Self::build_messages(&request, tools_enabled);

        let tools: Vec<Value> = if tools_enabled {
            request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let body = ChatBody {
            model: request.model.clone(),
            messages,
            stream: false,
            tools,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable {
                provider: "ollama",
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {})", e));
            return Err(ProviderError::Api {
                provider: "ollama",
                status,
                body,
            }
            .into());
        }

        let result: ChatResponse =
            response.json().await.map_err(|e| ProviderError::Malformed {
                provider: "ollama",
                reason: e.to_string(),
            })?;

        // This API carries no call ids; synthesize stable ones so result
        // messages pair up in later rounds.
        let tool_calls = result
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, tc)| ToolCallRequest {
                id: format!("call_{}", i),
                tool_name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ProviderReply {
            text: result.message.content,
            tool_calls,
        })
    }

    async fn list_models(&self) -> Vec<String> {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("Ollama tag endpoint returned {}; using fallback model list", r.status());
                return FALLBACK_MODELS.iter().map(|m| m.to_string()).collect();
            }
            Err(e) => {
                warn!("Ollama unreachable at {}: {}; using fallback model list", url, e);
                return FALLBACK_MODELS.iter().map(|m| m.to_string()).collect();
            }
        };

        match response.json::<TagsResponse>().await {
            Ok(tags) if !tags.models.is_empty() => {
                tags.models.into_iter().map(|m| m.name).collect()
            }
            Ok(_) => FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            Err(e) => {
                warn!("Failed to parse Ollama tag listing: {}", e);
                FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
            }
        }
    }
}

// ============================================================================
// Wire types (Ollama chat format)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatBody {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// Pre-parsed JSON object, unlike the cloud family's string encoding
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatTurn, ToolDefinition};
    use serde_json::json;

    #[test]
    fn test_response_arguments_are_preparsed() {
        let raw = r#"{
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "find_by_date_range",
                                  "arguments": {"start_date": "2023-01-01", "end_date": "2023-01-31"}}}
                ]
            },
            "done": true
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let calls = parsed.message.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "find_by_date_range");
        assert_eq!(calls[0].function.arguments["start_date"], "2023-01-01");
    }

    #[test]
    fn test_build_messages_skips_tools_for_plain_model() {
        let call = ToolCallRequest {
            id: "call_0".into(),
            tool_name: "find_by_party".into(),
            arguments: json!({"party": "bob"}),
        };
        let request = ChatRequest {
            model: "llama2".into(),
            system: None,
            messages: vec![
                ChatTurn::user("hello"),
                ChatTurn::assistant(None, vec![call.clone()]),
                ChatTurn::tool_result(&call, "[]"),
            ],
            tools: vec![ToolDefinition {
                name: "find_by_party".into(),
                description: "".into(),
                parameters: json!({}),
            }],
        };

        assert!(!request.tools_enabled());
        let messages = OllamaProvider::build_messages(&request, request.tools_enabled());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }
}
