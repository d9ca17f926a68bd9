//! Ollama HTTP client: chat completion with tool support, plus liveness and
//! model-listing probes.

use crate::types::{normalize_arguments, ChatRole, ToolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure talking to the model server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to model server failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode model response: {0}")]
    Decode(String),
}

// -- Wire types ---------------------------------------------------------------

/// One message of the `/api/chat` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            function: WireFunction {
                name: call.name.clone(),
                arguments: serde_json::Value::Object(call.arguments.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    pub options: ChatOptions,
}

/// Response envelope (also the shape of each streaming fragment).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

impl ChatResponse {
    /// A plain text response, mostly useful for scripted backends.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: Some(ResponseMessage {
                content: Some(content.into()),
                tool_calls: None,
            }),
            done: true,
        }
    }

    /// A response carrying native tool calls.
    pub fn with_tool_calls(content: impl Into<String>, calls: Vec<WireToolCall>) -> Self {
        Self {
            message: Some(ResponseMessage {
                content: Some(content.into()),
                tool_calls: Some(calls),
            }),
            done: true,
        }
    }

    /// Text channel content (empty when absent).
    pub fn content(&self) -> &str {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .unwrap_or("")
    }

    /// Native tool calls, normalized, in the order received.
    pub fn native_tool_calls(&self) -> Vec<ToolCall> {
        self.message
            .as_ref()
            .and_then(|m| m.tool_calls.as_ref())
            .map(|calls| {
                calls
                    .iter()
                    .filter(|c| !c.function.name.trim().is_empty())
                    .map(|c| {
                        ToolCall::new(
                            c.function.name.trim(),
                            normalize_arguments(Some(&c.function.arguments)),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

// -- Backend seam -------------------------------------------------------------

/// Anything that can answer a chat request. The agent loop only talks to
/// this trait so it can run against a scripted backend in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issue one non-streaming chat request.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;

    /// Streaming chat: `on_chunk` sees each content fragment; the full text
    /// is returned. Backends without streaming deliver one chunk.
    async fn chat_stream(
        &self,
        request: &ChatRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, TransportError> {
        let response = self.chat(request).await?;
        let content = response.content().to_string();
        if !content.is_empty() {
            on_chunk(&content);
        }
        Ok(content)
    }
}

// -- Client -------------------------------------------------------------------

/// Client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    pub(super) base_url: String,
    pub(super) http: reqwest::Client,
}

impl OllamaClient {
    /// Create a new client. `timeout` bounds each whole request.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probe `/api/tags`. Never fails; any problem reads as "not connected".
    pub async fn check_connection(&self) -> bool {
        self.fetch_tags().await.is_some()
    }

    /// Names of the models installed on the server; empty on any failure.
    pub async fn list_models(&self) -> Vec<String> {
        self.fetch_tags()
            .await
            .map(|tags| tags.models.into_iter().map(|m| m.name).collect())
            .unwrap_or_default()
    }

    async fn fetch_tags(&self) -> Option<TagsResponse> {
        let resp = match self.http.get(self.url("/api/tags")).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("Ollama probe failed: {}", e);
                return None;
            }
        };
        if !resp.status().is_success() {
            debug!("Ollama probe returned {}", resp.status());
            return None;
        }
        match resp.json::<TagsResponse>().await {
            Ok(tags) => Some(tags),
            Err(e) => {
                debug!("Ollama probe returned malformed body: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        debug!(
            "Chat request to model {} ({} messages)",
            request.model,
            request.messages.len()
        );

        let resp = self
            .http
            .post(self.url("/api/chat"))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, TransportError> {
        self.stream_chat(request, on_chunk).await
    }
}

/// Resolve the configured model against what the server has installed.
///
/// Keeps the configured name when any installed model matches it loosely
/// (`qwen2.5-coder` vs `qwen2.5-coder:7b`), otherwise falls back to the first
/// installed model. `None` when nothing is installed.
pub fn pick_model(configured: &str, available: &[String]) -> Option<String> {
    if available
        .iter()
        .any(|m| m.contains(configured) || configured.contains(m.as_str()))
    {
        return Some(configured.to_string());
    }
    available.first().cloned()
}
