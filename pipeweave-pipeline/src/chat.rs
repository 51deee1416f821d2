//! Single-backend chat pipeline.
//!
//! The simplest replay pipeline: answer the conversation, then refine a
//! truncated preview of that answer in a follow-up step. Both steps go to
//! the local backend; the runner handles buffered vs streaming output.

use async_trait::async_trait;
use pipeweave_core::{
    ChatBackend, Message, PipeError, PipeOutput, PipeRequest, Pipeline, SequenceRunner,
};
use std::sync::Arc;

/// Characters of the first answer carried into the follow-up prompt.
const PREVIEW_CHARS: usize = 100;

pub struct ChatPipeline {
    runner: SequenceRunner,
}

impl ChatPipeline {
    pub fn new(local: Arc<dyn ChatBackend>) -> Self {
        Self {
            runner: SequenceRunner::new(local),
        }
    }

    /// Streaming default applied when the request has no preference.
    pub fn with_default_stream(mut self, stream: bool) -> Self {
        self.runner = self.runner.with_default_stream(stream);
        self
    }
}

#[async_trait]
impl Pipeline for ChatPipeline {
    fn name(&self) -> &str {
        "chat"
    }

    async fn pipe(&self, req: PipeRequest) -> Result<PipeOutput, PipeError> {
        let messages = req.messages.clone();
        let output = self
            .runner
            .run(req.body.stream, |mut ctx| async move {
                let first = ctx.request(messages).await;
                let preview: String = first.chars().take(PREVIEW_CHARS).collect();
                ctx.request(vec![Message::user(format!(
                    "Compare the candidate part numbers against this result: {preview}..."
                ))])
                .await;
                ctx
            })
            .await;
        Ok(output)
    }
}
