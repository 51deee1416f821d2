//! # pipeweave-backend
//!
//! Concrete `ChatBackend` implementations: an Ollama-compatible local
//! inference server and the hosted OpenRouter service. The two adapters
//! frame their streaming output differently on purpose (raw passthrough
//! vs re-encoded deltas); see the module docs.

pub mod ollama;
pub mod openrouter;

// Re-exports
pub use ollama::{OllamaBackend, OllamaSettings};
pub use openrouter::{OpenRouterBackend, OpenRouterSettings};

/// Create an OpenRouter backend from just an API key, with default
/// endpoint and model.
pub fn openrouter(api_key: impl Into<String>) -> OpenRouterBackend {
    OpenRouterBackend::new(OpenRouterSettings {
        api_key: api_key.into(),
        ..Default::default()
    })
}
