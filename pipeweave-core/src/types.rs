//! Core types shared by the runner, the backend adapters, and pipelines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Finish reason carried by a wire chunk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Error,
}

/// Identity of the caller, forwarded by the host when known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub id: String,
    pub name: String,
}

/// Request-context bundle supplied by the host alongside a `pipe` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CallerIdentity>,
    /// Per-request streaming preference; falls back to the configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One `pipe` invocation from the host: the latest user message, the model
/// the host selected, the full prior conversation, and the context bundle.
#[derive(Debug, Clone)]
pub struct PipeRequest {
    pub request_id: String,
    pub user_message: String,
    pub model_id: String,
    pub messages: Vec<Message>,
    pub body: PipeBody,
}

impl PipeRequest {
    /// Create a new request with a fresh request id
    pub fn new(
        user_message: impl Into<String>,
        model_id: impl Into<String>,
        messages: Vec<Message>,
        body: PipeBody,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_message: user_message.into(),
            model_id: model_id.into(),
            messages,
            body,
        }
    }
}
