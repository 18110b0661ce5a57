//! Chat-completions provider seam.
//!
//! `ChatProvider` is the only thing the invocation layer knows about the
//! remote service. `OpenAiCompatProvider` talks to any OpenAI-compatible
//! `/chat/completions` endpoint (Groq by default).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed provider failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Provider returned empty content")]
    EmptyContent,
}

/// Coarse failure class carried in attempt records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    Timeout,
    Server,
    Transport,
    Auth,
    BadRequest,
    ModelUnavailable,
    EmptyContent,
}

impl ProviderError {
    /// Transient failures are retried on the same model; everything else
    /// moves straight to the next fallback.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_)
                | ProviderError::Timeout
                | ProviderError::Server { .. }
                | ProviderError::Transport(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::RateLimited(_) => ErrorKind::RateLimited,
            ProviderError::Timeout => ErrorKind::Timeout,
            ProviderError::Server { .. } => ErrorKind::Server,
            ProviderError::Transport(_) => ErrorKind::Transport,
            ProviderError::Auth(_) => ErrorKind::Auth,
            ProviderError::BadRequest(_) => ErrorKind::BadRequest,
            ProviderError::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            ProviderError::EmptyContent => ErrorKind::EmptyContent,
        }
    }
}

/// One chat request, independent of the model it is sent to.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub system: Option<&'a str>,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object response.
    pub json: bool,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, model: &str, request: &ChatRequest<'_>)
        -> Result<String, ProviderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible HTTP provider
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatProvider {
    /// The per-attempt timeout is enforced by the invocation layer; the
    /// client timeout here is only a backstop for hung connections.
    pub fn new(base_url: &str, api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        model: &str,
        request: &ChatRequest<'_>,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(CompletionMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(CompletionMessage {
            role: "user",
            content: request.user,
        });

        let body = CompletionRequest {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_status(status.as_u16(), message));
        }

        let completion: CompletionResponse =
            response.json().await.map_err(map_transport_error)?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Maps a non-success HTTP status onto the failure taxonomy.
pub fn classify_status(status: u16, message: String) -> ProviderError {
    let lowered = message.to_lowercase();
    let model_gone = lowered.contains("model_not_found")
        || lowered.contains("does not exist")
        || lowered.contains("decommissioned");

    match status {
        429 => ProviderError::RateLimited(message),
        401 | 403 => ProviderError::Auth(message),
        404 => ProviderError::ModelUnavailable(message),
        408 => ProviderError::Timeout,
        400..=499 if model_gone => ProviderError::ModelUnavailable(message),
        500..=599 => ProviderError::Server { status, message },
        _ => ProviderError::BadRequest(message),
    }
}
