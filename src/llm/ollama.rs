// ABOUTME: Ollama client for local LLM inference over the native /api/chat endpoint.
// ABOUTME: Connects to OLLAMA_HOST (default localhost:11434); synthesizes tool call ids.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ContentBlock, LlmClient, Message, PerResultMessages, Request, Response, ResultAppender, Role,
    StopReason, ToolCall, ToolDefinition, Usage,
};
use crate::error::LlmError;

/// Default Ollama server address.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default model when none is specified.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2";

/// Ollama chat request.
#[derive(Debug, Serialize)]
pub struct OllamaRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OllamaTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Sampling options.
#[derive(Debug, Default, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OllamaToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaToolCall {
    pub function: OllamaFunctionCall,
}

/// Ollama sends arguments as a JSON object, not a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct OllamaTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OllamaFunction,
}

#[derive(Debug, Serialize)]
pub struct OllamaFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Ollama chat response (non-streaming).
#[derive(Debug, Deserialize)]
pub struct OllamaResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: OllamaMessage,
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: u32,
    #[serde(default)]
    pub eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

impl From<&ToolDefinition> for OllamaTool {
    fn from(tool: &ToolDefinition) -> Self {
        OllamaTool {
            tool_type: "function".to_string(),
            function: OllamaFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

/// Convert canonical history to Ollama messages.
///
/// Ollama correlates results by tool name, so the name for each call id is
/// remembered from the assistant turn that issued it.
fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
    let mut names_by_id = std::collections::HashMap::new();
    let mut result = Vec::new();

    for msg in messages {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in &msg.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(t),
                ContentBlock::ToolUse { id, name, input } => {
                    names_by_id.insert(id.clone(), name.clone());
                    tool_calls.push(OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: name.clone(),
                            arguments: input.clone(),
                        },
                    });
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => result.push(OllamaMessage {
                    role: "tool".to_string(),
                    content: content.clone(),
                    tool_calls: Vec::new(),
                    tool_name: names_by_id.get(tool_use_id).cloned(),
                }),
            }
        }

        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => continue,
        };
        if text.is_empty() && tool_calls.is_empty() {
            continue;
        }

        result.push(OllamaMessage {
            role: role.to_string(),
            content: text,
            tool_calls,
            tool_name: None,
        });
    }

    result
}

impl From<&Request> for OllamaRequest {
    fn from(req: &Request) -> Self {
        let mut messages = Vec::new();
        if let Some(ref system) = req.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
                ..Default::default()
            });
        }
        messages.extend(convert_messages(&req.messages));

        let options = if req.temperature.is_some() || req.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: req.temperature,
                num_predict: req.max_tokens,
            })
        } else {
            None
        };

        OllamaRequest {
            model: req.model.clone(),
            messages,
            stream: false,
            tools: req.tools.iter().map(OllamaTool::from).collect(),
            options,
        }
    }
}

impl From<OllamaResponse> for Response {
    fn from(resp: OllamaResponse) -> Self {
        let tool_calls: Vec<ToolCall> = resp
            .message
            .tool_calls
            .into_iter()
            .map(|call| {
                let arguments = match call.function.arguments {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => "{}".to_string(),
                    other => other.to_string(),
                };
                ToolCall::new(
                    format!("call_{}", uuid::Uuid::new_v4().simple()),
                    call.function.name,
                    arguments,
                )
            })
            .collect();

        let stop_reason = if !tool_calls.is_empty() {
            StopReason::ToolUse
        } else if resp.done_reason.as_deref() == Some("length") {
            StopReason::MaxTokens
        } else {
            StopReason::EndTurn
        };

        let text = resp.message.content;
        Response {
            id: String::new(),
            text: if text.is_empty() { None } else { Some(text) },
            tool_calls,
            stop_reason,
            model: resp.model,
            usage: Usage {
                input_tokens: resp.prompt_eval_count,
                output_tokens: resp.eval_count,
            },
        }
    }
}

/// Client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
    default_model: String,
}

impl OllamaClient {
    /// Create a new Ollama client connecting to localhost:11434.
    pub fn new(model: &str) -> Self {
        Self::with_base_url(OLLAMA_BASE_URL, model)
    }

    /// Create a new Ollama client with a custom base URL.
    ///
    /// # Arguments
    /// * `base_url` - The server root (e.g., "http://remote-server:11434")
    /// * `model` - The default model to use (e.g., "llama3.2", "qwen2.5")
    pub fn with_base_url(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            default_model: if model.is_empty() {
                OLLAMA_DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(OLLAMA_DEFAULT_MODEL)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let mut ollama_req = OllamaRequest::from(req);
        if ollama_req.model.is_empty() {
            ollama_req.model = self.default_model.clone();
        }

        let url = format!("{}/api/chat", self.base_url);
        debug!(
            model = %ollama_req.model,
            messages = ollama_req.messages.len(),
            tools = ollama_req.tools.len(),
            "ollama request"
        );

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&ollama_req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let ollama_resp: OllamaResponse = response.json().await?;
        Ok(Response::from(ollama_resp))
    }

    fn result_appender(&self) -> &dyn ResultAppender {
        &PerResultMessages
    }
}
