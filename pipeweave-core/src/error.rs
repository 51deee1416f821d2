//! Error types for pipeline operations.
//!
//! Errors only travel between internal layers. At the backend-adapter
//! boundary every failure is downgraded to in-band data (an error string
//! or a synthetic error chunk), and `run_pipe` converts anything that
//! still escapes a pipeline body into an `"Error: ..."` text response.

/// The main error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend returned a non-success status or an unusable body
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Search provider errors
    #[error("search error: {0}")]
    Search(String),

    /// Product selector errors
    #[error("selector error: {0}")]
    Selector(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl PipeError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a search error
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Create a selector error
    pub fn selector(msg: impl Into<String>) -> Self {
        Self::Selector(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<String> for PipeError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for PipeError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}
