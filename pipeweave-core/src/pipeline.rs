//! Host plugin contract.
//!
//! The host application discovers pipelines, drives their lifecycle hooks
//! around server start/stop, and calls `pipe` once per chat request. A
//! pipeline answers with either a complete text or a lazy chunk stream in
//! the backend wire format.

use crate::backend::ByteStream;
use crate::error::PipeError;
use crate::types::PipeRequest;
use async_trait::async_trait;

/// What a `pipe` call hands back to the host.
pub enum PipeOutput {
    /// Complete response text
    Text(String),
    /// Lazy sequence of wire chunks
    Stream(ByteStream),
}

impl PipeOutput {
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl std::fmt::Debug for PipeOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A chat-completion pipeline exposed to the host.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Display name shown by the host
    fn name(&self) -> &str;

    /// Called when the host server starts.
    async fn on_startup(&self) -> Result<(), PipeError> {
        tracing::info!(pipeline = self.name(), "startup");
        Ok(())
    }

    /// Called when the host server stops.
    async fn on_shutdown(&self) -> Result<(), PipeError> {
        tracing::info!(pipeline = self.name(), "shutdown");
        Ok(())
    }

    /// Handle one chat request.
    async fn pipe(&self, req: PipeRequest) -> Result<PipeOutput, PipeError>;
}

/// Invoke a pipeline with the top-level catch-all applied: any error the
/// pipeline body lets escape becomes a well-formed text response instead
/// of a failure surfaced to the host.
pub async fn run_pipe(pipeline: &dyn Pipeline, req: PipeRequest) -> PipeOutput {
    tracing::debug!(
        pipeline = pipeline.name(),
        request_id = %req.request_id,
        model = %req.model_id,
        "pipe invoked"
    );
    if let Some(user) = &req.body.user {
        tracing::info!(user_id = %user.id, user_name = %user.name, message = %req.user_message, "caller");
    }

    match pipeline.pipe(req).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(pipeline = pipeline.name(), error = %e, "pipe failed");
            PipeOutput::Text(format!("Error: {e}"))
        }
    }
}
