//! Hosted-router adapter for the OpenRouter service.
//!
//! Same chat-completions protocol as the local adapter, plus a bearer
//! token. Streaming differs deliberately: each received delta is
//! re-encoded into the minimal chunk envelope before being forwarded, and
//! forwarding stops at the explicit `[DONE]` marker. Lines that fail to
//! parse are skipped silently.

use async_trait::async_trait;
use pipeweave_core::backend::{error_stream, ByteStream, ChatBackend};
use pipeweave_core::codec;
use pipeweave_core::types::Message;
use pipeweave_core::PipeError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::StreamExt;

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "qwen/qwen2.5-vl-3b-instruct:free".to_string()
}

/// Connection settings for the hosted router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
        }
    }
}

/// Hosted router backend.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    client: reqwest::Client,
    settings: OpenRouterSettings,
}

impl OpenRouterBackend {
    pub fn new(settings: OpenRouterSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &OpenRouterSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
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
            .bearer_auth(&self.settings.api_key)
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
impl ChatBackend for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, messages: &[Message], model: Option<&str>) -> String {
        match self.try_complete(messages, model).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(backend = "openrouter", error = %e, "buffered request failed");
                format!("Error: {e}")
            }
        }
    }

    async fn stream(&self, messages: &[Message], model: Option<&str>) -> ByteStream {
        let response = match self.send(messages, model, true).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(backend = "openrouter", error = %e, "streaming request failed");
                return error_stream(&format!("Error: {e}"));
            }
        };

        Box::pin(async_stream::stream! {
            let lines = codec::lines(response.bytes_stream());
            futures::pin_mut!(lines);
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(backend = "openrouter", error = %e, "transport failed mid-stream");
                        yield codec::encode_error_chunk(&format!("Error: {e}"));
                        return;
                    }
                };

                if is_done_marker(&line) {
                    break;
                }
                // Re-wrap the delta in the minimal envelope; skip lines
                // that do not parse or carry no content.
                if let Some(content) = codec::decode_content(&line) {
                    if !content.is_empty() {
                        yield codec::encode_delta(&content);
                    }
                }
            }
        })
    }
}

fn is_done_marker(line: &[u8]) -> bool {
    std::str::from_utf8(line)
        .map(|text| {
            text.strip_prefix(codec::DATA_PREFIX).unwrap_or(text).trim() == codec::DONE_MARKER
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults() {
        let settings = OpenRouterSettings::default();
        assert_eq!(settings.base_url, "https://openrouter.ai/api/v1");
        assert!(settings.api_key.is_empty());

        let parsed: OpenRouterSettings =
            serde_json::from_str(r#"{"api_key":"sk-or-test"}"#).unwrap();
        assert_eq!(parsed.api_key, "sk-or-test");
        assert_eq!(parsed.model, settings.model);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let backend = OpenRouterBackend::new(OpenRouterSettings::default());
        assert_eq!(
            backend.endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn done_marker_detection() {
        assert!(is_done_marker(b"data: [DONE]"));
        assert!(is_done_marker(b"[DONE]"));
        assert!(!is_done_marker(b"data: {\"choices\":[]}"));
    }

    #[tokio::test]
    async fn unreachable_server_degrades_to_error_string() {
        let backend = OpenRouterBackend::new(OpenRouterSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        });
        let text = backend.complete(&[Message::user("hi")], None).await;
        assert!(text.starts_with("Error:"), "got: {text}");
    }
}
