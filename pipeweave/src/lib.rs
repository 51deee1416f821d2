//! # Pipeweave
//!
//! Composable chat-completion pipelines with record/replay streaming.
//!
//! A pipeline receives one chat request from a host application and answers
//! with either buffered text or a stream of OpenAI-style wire chunks. The
//! built-in pipelines chain several backend completions into one reply,
//! mix a local inference server with a hosted router, and augment prompts
//! with retry-protected web search.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! pipeweave = { version = "0.1", features = ["backends", "pipelines"] }
//! ```
//!
//! ```ignore
//! use pipeweave::prelude::*;
//! use pipeweave::backend::{OllamaBackend, OllamaSettings};
//! use pipeweave::pipeline::ChatPipeline;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let backend = Arc::new(OllamaBackend::new(OllamaSettings::default()));
//! let pipeline = ChatPipeline::new(backend);
//!
//! let req = PipeRequest::new(
//!     "Compare NT5AD512M16C4 against our catalog",
//!     "qwen2.5:latest",
//!     vec![Message::user("Compare NT5AD512M16C4 against our catalog")],
//!     PipeBody::default(),
//! );
//!
//! match run_pipe(&pipeline, req).await {
//!     PipeOutput::Text(text) => println!("{text}"),
//!     PipeOutput::Stream(_chunks) => { /* forward chunks to the client */ }
//! }
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: backends, search, and pipelines
//! - `backends`: local-inference and hosted-router adapters
//! - `search`: DuckDuckGo search client
//! - `pipelines`: built-in pipelines (implies `search`)
//! - `full`: all features

// Re-export core types and traits
pub use pipeweave_core::*;

// Re-export backend adapters under `backend` module
#[cfg(feature = "pipeweave-backend")]
pub mod backend {
    //! Chat backend adapters.
    pub use pipeweave_backend::*;
}

// Re-export the search client under `search` module
#[cfg(feature = "pipeweave-search")]
pub mod search {
    //! Retry-protected web search.
    pub use pipeweave_search::*;
}

// Re-export built-in pipelines under `pipeline` module
#[cfg(feature = "pipeweave-pipeline")]
pub mod pipeline {
    //! Built-in pipeline plugins.
    pub use pipeweave_pipeline::*;
}

/// Prelude module for convenient imports
pub mod prelude {
    //! Prelude module containing the most commonly used types and traits.
    //!
    //! ```
    //! use pipeweave::prelude::*;
    //! ```

    pub use crate::{
        run_pipe, ChatBackend, Message, PipeBody, PipeError, PipeOutput, PipeRequest, Pipeline,
        Result, Role, SequenceRunner,
    };

    #[cfg(feature = "pipeweave-backend")]
    pub use crate::backend::*;

    #[cfg(feature = "pipeweave-search")]
    pub use crate::search::*;

    #[cfg(feature = "pipeweave-pipeline")]
    pub use crate::pipeline::*;
}
