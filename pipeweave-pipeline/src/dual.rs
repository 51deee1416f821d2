//! Dual-backend pipeline.
//!
//! Answers with the local backend, builds a comparison step from that
//! answer, injects a synthetic status divider, and finishes with a review
//! step on the hosted router. All dual-mode handling is delegated to the
//! sequence runner.

use async_trait::async_trait;
use pipeweave_core::{
    ChatBackend, Message, PipeError, PipeOutput, PipeRequest, Pipeline, SequenceRunner,
};
use std::sync::Arc;

const REVIEW_DIVIDER: &str = "\n\n---\n\nCross-checking the comparison with the hosted router...\n\n";

pub struct DualBackendPipeline {
    runner: SequenceRunner,
}

impl DualBackendPipeline {
    pub fn new(local: Arc<dyn ChatBackend>, router: Arc<dyn ChatBackend>) -> Self {
        Self {
            runner: SequenceRunner::new(local).with_router(router),
        }
    }

    pub fn with_default_stream(mut self, stream: bool) -> Self {
        self.runner = self.runner.with_default_stream(stream);
        self
    }
}

#[async_trait]
impl Pipeline for DualBackendPipeline {
    fn name(&self) -> &str {
        "dual-backend"
    }

    async fn pipe(&self, req: PipeRequest) -> Result<PipeOutput, PipeError> {
        let messages = req.messages.clone();
        let output = self
            .runner
            .run(req.body.stream, |mut ctx| async move {
                let first = ctx.request(messages).await;
                let second = ctx
                    .request(vec![Message::user(format!(
                        "Compare the candidate part numbers against this result: {first}"
                    ))])
                    .await;
                ctx.emit_text(REVIEW_DIVIDER);
                ctx.router_request(vec![Message::user(format!(
                    "Review the comparison below and point out anything inconsistent:\n\n{second}"
                ))])
                .await;
                ctx
            })
            .await;
        Ok(output)
    }
}
