//! Local-inference adapter for an Ollama-compatible server.
//!
//! Speaks the OpenAI-style chat-completions protocol without
//! authentication. In streaming mode the received event lines are
//! forwarded exactly as they arrive, with no re-encoding; the stream ends
//! when the server closes the connection. The host's chunk consumer
//! depends on this passthrough framing, so it must not be unified with
//! the router adapter's re-wrapping.

use async_trait::async_trait;
use pipeweave_core::backend::{error_stream, ByteStream, ChatBackend};
use pipeweave_core::codec;
use pipeweave_core::types::Message;
use pipeweave_core::PipeError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::StreamExt;

fn default_base_url() -> String {
    "http://ollama:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5:latest".to_string()
}

/// Connection settings for the local inference server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
        }
    }
}

/// Local inference backend.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    settings: OllamaSettings,
}

impl OllamaBackend {
    pub fn new(settings: OllamaSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &OllamaSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    async fn send(
        &self,
        messages: &[Message],
        model: Option<&str>,
        stream: bool,
    ) -> Result<reqwest::Response, PipeError> {
        let model = model.unwrap_or(&self.settings.model).trim();
        let payload = json!({
            "model": model,
            "messages": messages,
            "stream": stream,
        });
        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }

    async fn try_complete(
        &self,
        messages: &[Message],
        model: Option<&str>,
    ) -> Result<String, PipeError> {
        let response = self.send(messages, model, false).await?;
        let body: codec::CompletionResponse = response.json().await?;
        Ok(body.first_content())
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, messages: &[Message], model: Option<&str>) -> String {
        match self.try_complete(messages, model).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(backend = "ollama", error = %e, "buffered request failed");
                format!("Error: {e}")
            }
        }
    }

    async fn stream(&self, messages: &[Message], model: Option<&str>) -> ByteStream {
        let response = match self.send(messages, model, true).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(backend = "ollama", error = %e, "streaming request failed");
                return error_stream(&format!("Error: {e}"));
            }
        };

        Box::pin(async_stream::stream! {
            let lines = codec::lines(response.bytes_stream());
            futures::pin_mut!(lines);
            while let Some(line) = lines.next().await {
                match line {
                    // Raw passthrough, exactly as received.
                    Ok(line) => yield line,
                    Err(e) => {
                        tracing::warn!(backend = "ollama", error = %e, "transport failed mid-stream");
                        yield codec::encode_error_chunk(&format!("Error: {e}"));
                        return;
                    }
                }
            }
        })
    }
}
