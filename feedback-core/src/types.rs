//! Client-facing request and response types
//!
//! Serde field names match the JSON wire exactly, so these types serve both
//! the HTTP server layer and library consumers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A request for AI-generated feedback text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The customer message to respond to; must be non-empty after trimming
    pub message: String,

    /// Optional background context included in the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Optional tone instruction, e.g. "formal"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    /// Optional response language, e.g. "Spanish"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Optional generation parameter overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,

    /// Prior conversation turns forwarded upstream ahead of the prompt
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryMessage>,
}

impl GenerationRequest {
    /// Create a request carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Check the request invariants
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(Error::Validation("message must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Generation parameters a caller may override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One prior conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// The completed reply for a single-shot request; immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Upstream-supplied identifier, or one synthesized by the bridge
    pub id: String,

    /// Model name the reply was generated with
    pub model: String,

    /// The generated reply text
    pub output: String,

    /// Token accounting, zeroed when the upstream omits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token counts for one completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
