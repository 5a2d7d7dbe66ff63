//! OpenAI-compatible LLM provider implementation.
//!
//! Works against any endpoint speaking the chat-completions protocol
//! (OpenAI, Azure OpenAI deployments behind a compatible proxy, vLLM, etc.).
//! Streaming uses server-sent events: `data: {json}` lines terminated by
//! `data: [DONE]`.

use crate::client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage, Role,
};
use futures::StreamExt;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

/// Chat-completions response format (non-streaming).
#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// One SSE event payload of a streaming response.
#[derive(Debug, Deserialize)]
struct OpenAiStreamEvent {
    #[serde(default)]
    model: String,
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible LLM client.
pub struct OpenAiClient {
    /// Base URL for the chat-completions API
    base_url: String,

    /// Bearer token
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a new client against the public OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a new client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert LlmRequest to chat-completions format.
    fn to_openai_request(&self, request: &LlmRequest) -> OpenAiChatRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: role_name(m),
                content: m.content.clone(),
            })
            .collect();

        OpenAiChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: request.stream,
        }
    }

    async fn send(&self, body: &OpenAiChatRequest) -> AppResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Model(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Model(format!(
                "Chat completions API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

fn role_name(message: &ChatMessage) -> String {
    match message.role {
        Role::System => "system".to_string(),
        Role::Human => "user".to_string(),
        Role::Ai => "assistant".to_string(),
    }
}

/// Parse one SSE `data:` payload into a stream fragment.
///
/// Returns `None` for payloads that carry no choices (keep-alives).
fn parse_sse_data(data: &str) -> Option<AppResult<LlmStreamChunk>> {
    if data == "[DONE]" {
        return Some(Ok(LlmStreamChunk {
            content: String::new(),
            model: String::new(),
            done: true,
            usage: None,
        }));
    }

    let event: OpenAiStreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            return Some(Err(AppError::Model(format!(
                "Failed to parse stream event: {}",
                e
            ))))
        }
    };

    let choice = event.choices.into_iter().next()?;

    Some(Ok(LlmStreamChunk {
        content: choice.delta.content.unwrap_or_default(),
        model: event.model,
        done: choice.finish_reason.is_some(),
        usage: None,
    }))
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            "Sending chat-completions request (model: {})",
            request.model
        );

        let mut body = self.to_openai_request(request);
        body.stream = false;

        let response = self.send(&body).await?;

        let parsed: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Model(format!("Failed to parse response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Model("Response contained no choices".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: parsed.model,
            usage,
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(
            "Starting streaming chat-completions request (model: {})",
            request.model
        );

        let mut body = self.to_openai_request(request);
        body.stream = true;

        let response = self.send(&body).await?;

        // SSE events may split across network chunks; carry the partial line
        // between reads.
        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| AppError::Model(format!("Stream error: {}", e))))
            .scan(String::new(), |buffer, result| {
                let fragments: Vec<AppResult<LlmStreamChunk>> = match result {
                    Err(e) => vec![Err(e)],
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));

                        let mut fragments = Vec::new();
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);

                            if let Some(data) = line.strip_prefix("data:") {
                                if let Some(fragment) = parse_sse_data(data.trim()) {
                                    fragments.push(fragment);
                                }
                            }
                        }
                        fragments
                    }
                };

                futures::future::ready(Some(futures::stream::iter(fragments)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }
}
