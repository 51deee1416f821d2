//! True-streaming chained pipeline.
//!
//! Unlike the replay pipelines this one never buffers a whole response:
//! the first completion is forwarded chunk by chunk while its content is
//! accumulated through the codec, then a literal divider is emitted, then
//! a second completion built from the accumulated text streams out. Each
//! backend call is issued exactly once.

use async_trait::async_trait;
use pipeweave_core::backend::ByteStream;
use pipeweave_core::{codec, ChatBackend, Message, PipeError, PipeOutput, PipeRequest, Pipeline};
use std::sync::Arc;
use tokio_stream::StreamExt;

/// The host probes every pipeline for a chat title with this prefix;
/// answer it with a constant instead of a backend round trip.
pub(crate) const TITLE_PROBE_PREFIX: &str = "Create a concise";
pub(crate) const TITLE_REPLY: &str = "Pipeline session";

const FOLLOW_UP_DIVIDER: &str = "\n\n### Follow-up\n\n";

pub struct LiveStreamPipeline {
    local: Arc<dyn ChatBackend>,
    model: Option<String>,
}

impl LiveStreamPipeline {
    pub fn new(local: Arc<dyn ChatBackend>) -> Self {
        Self { local, model: None }
    }

    /// Override the backend's configured model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[async_trait]
impl Pipeline for LiveStreamPipeline {
    fn name(&self) -> &str {
        "live-stream"
    }

    async fn pipe(&self, req: PipeRequest) -> Result<PipeOutput, PipeError> {
        if req.user_message.starts_with(TITLE_PROBE_PREFIX) {
            return Ok(PipeOutput::Text(TITLE_REPLY.to_string()));
        }

        let local = self.local.clone();
        let model = self.model.clone();
        let messages = req.messages.clone();

        let output: ByteStream = Box::pin(async_stream::stream! {
            let mut first_content = String::new();
            let mut first = local.stream(&messages, model.as_deref()).await;
            while let Some(chunk) = first.next().await {
                if let Some(delta) = codec::decode_content(&chunk) {
                    first_content.push_str(&delta);
                }
                yield chunk;
            }
            tracing::debug!(chars = first_content.len(), "first response complete");

            yield codec::encode_delta(FOLLOW_UP_DIVIDER);

            let follow = vec![Message::user(format!(
                "{first_content}\n\nSummarize the answer above in two sentences."
            ))];
            let mut second = local.stream(&follow, model.as_deref()).await;
            while let Some(chunk) = second.next().await {
                yield chunk;
            }
        });

        Ok(PipeOutput::Stream(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeweave_core::backend::collect_content;
    use pipeweave_core::{run_pipe, PipeBody};
    use std::sync::Mutex;

    struct ScriptedBackend {
        replies: Vec<&'static str>,
        streams: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                replies,
                streams: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _messages: &[Message], _model: Option<&str>) -> String {
            unreachable!("live pipeline never buffers")
        }

        async fn stream(&self, messages: &[Message], _model: Option<&str>) -> ByteStream {
            let reply = {
                let mut calls = self.streams.lock().unwrap();
                let reply = self.replies[calls.len()];
                calls.push(messages.to_vec());
                reply
            };
            let chunks: Vec<_> = reply
                .split_inclusive(' ')
                .map(codec::encode_delta)
                .collect();
            Box::pin(futures::stream::iter(chunks))
        }
    }

    fn req(user_message: &str) -> PipeRequest {
        PipeRequest::new(
            user_message,
            "m",
            vec![Message::user(user_message)],
            PipeBody::default(),
        )
    }

    #[tokio::test]
    async fn title_probe_short_circuits() {
        let backend = ScriptedBackend::new(vec![]);
        let pipeline = LiveStreamPipeline::new(backend.clone());

        let output = run_pipe(&pipeline, req("Create a concise title for this chat")).await;
        match output {
            PipeOutput::Text(text) => assert_eq!(text, TITLE_REPLY),
            PipeOutput::Stream(_) => panic!("expected text"),
        }
        assert!(backend.streams.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_prompt_embeds_accumulated_first_response() {
        let backend = ScriptedBackend::new(vec!["the answer is 42", "summary text"]);
        let pipeline = LiveStreamPipeline::new(backend.clone());

        let output = run_pipe(&pipeline, req("what is the answer?")).await;
        let content = match output {
            PipeOutput::Stream(s) => collect_content(s).await,
            PipeOutput::Text(t) => panic!("expected stream, got {t}"),
        };

        assert!(content.starts_with("the answer is 42"));
        assert!(content.contains(FOLLOW_UP_DIVIDER));
        assert!(content.ends_with("summary text"));

        let calls = backend.streams.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1][0].content.contains("the answer is 42"));
        assert!(calls[1][0].content.contains("Summarize the answer above"));
    }
}
