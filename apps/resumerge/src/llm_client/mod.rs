//! LLM Client: the single point of entry for every model call in resumerge.
//!
//! No other module talks to a provider directly. Backends (local Ollama or the
//! hosted OpenAI API) sit behind `ChatBackend`; callers only see `LlmClient`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::{Config, Provider};

pub mod ollama;
pub mod openai;
pub mod prompts;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("OPENAI_API_KEY is not set (env or .env)")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// A chat-completion provider that is asked to answer with a JSON object.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one system + user exchange and returns the raw assistant text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    fn name(&self) -> &'static str;

    fn model(&self) -> &str;
}

/// Wraps the configured backend with JSON reply handling.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn ChatBackend>,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Builds the backend selected by `config.provider`.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let backend: Arc<dyn ChatBackend> = match config.provider {
            Provider::Ollama => Arc::new(OllamaBackend::new(
                http,
                &config.ollama_host,
                config.model.clone(),
            )),
            Provider::OpenAi => {
                let api_key = config
                    .openai_api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(LlmError::MissingApiKey)?;
                let backend = OpenAiBackend::new(http, api_key, config.model.clone());
                match &config.openai_base_url {
                    Some(url) => Arc::new(backend.with_url(url.clone())),
                    None => Arc::new(backend),
                }
            }
        };
        Ok(Self::new(backend))
    }

    pub fn describe(&self) -> String {
        format!("{} ({})", self.backend.name(), self.backend.model())
    }

    /// Calls the model and deserializes its reply as JSON.
    /// The prompt must instruct the model to return a JSON object.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.backend.complete(system, prompt).await?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        parse_json_reply(&text)
    }
}

/// Sends the request built by `build`, retrying on 429, 5xx and transport
/// errors with exponential backoff. Returns the first successful response.
pub(crate) async fn send_with_retry<F>(build: F) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "LLM call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        return Ok(response);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: MAX_RETRIES,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorBody {
    Nested { error: ApiErrorDetail },
    Flat { error: String },
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Pulls the message out of `{"error": {"message": ..}}` (OpenAI) or
/// `{"error": ".."}` (Ollama) bodies, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody::Nested { error }) => error.message,
        Ok(ApiErrorBody::Flat { error }) => error,
        Err(_) => body.to_string(),
    }
}

/// Parses a model reply as JSON. Code fences are stripped; if the reply has
/// trailing garbage after the object, it is cut at the last `}` and retried.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first) => match text.rfind('}') {
            Some(end) if end + 1 < text.len() => {
                serde_json::from_str(&text[..=end]).map_err(LlmError::Parse)
            }
            _ => Err(LlmError::Parse(first)),
        },
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
