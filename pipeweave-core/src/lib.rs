//! # pipeweave-core
//!
//! Core abstractions for chat-completion pipelines: the backend seam, the
//! wire chunk codec, the record/replay sequence runner, and the host
//! plugin contract.

pub mod backend;
pub mod codec;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod types;

// Re-exports
pub use backend::{collect_content, error_stream, ByteStream, ChatBackend};
pub use error::PipeError;
pub use pipeline::{run_pipe, PipeOutput, Pipeline};
pub use runner::{SequenceContext, SequenceRunner, Step, Target};
pub use types::*;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipeError>;
