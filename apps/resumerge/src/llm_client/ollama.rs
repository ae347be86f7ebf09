use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_with_retry, ChatBackend, ChatMessage, LlmError};

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    format: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// Local model served by Ollama's `/api/chat`, in JSON mode.
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(client: Client, host: &str, model: String) -> Self {
        Self {
            client,
            url: format!("{}/api/chat", host.trim_end_matches('/')),
            model,
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            format: "json",
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };

        let response = send_with_retry(|| self.client.post(&self.url).json(&body)).await?;
        let reply: OllamaChatResponse = response.json().await?;

        debug!(
            "Ollama call succeeded: prompt_tokens={:?}, output_tokens={:?}",
            reply.prompt_eval_count, reply.eval_count
        );

        reply
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joins_host() {
        let backend = OllamaBackend::new(Client::new(), "http://gpu-box:11434/", "llama3.2".into());
        assert_eq!(backend.url, "http://gpu-box:11434/api/chat");
        assert_eq!(backend.model(), "llama3.2");
    }

    #[test]
    fn test_request_serialization() {
        let request = OllamaChatRequest {
            model: "llama3.2",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            format: "json",
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "llama3.2",
                "messages": [{"role": "user", "content": "hi"}],
                "format": "json",
                "stream": false,
                "options": {"temperature": 0.0}
            })
        );
    }

    #[test]
    fn test_response_deserialization() {
        let reply: OllamaChatResponse = serde_json::from_value(json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "{\"name\": \"Jane\"}"},
            "done": true,
            "eval_count": 12
        }))
        .unwrap();
        assert_eq!(reply.message.unwrap().content, "{\"name\": \"Jane\"}");
        assert_eq!(reply.eval_count, Some(12));
        assert_eq!(reply.prompt_eval_count, None);
    }
}
