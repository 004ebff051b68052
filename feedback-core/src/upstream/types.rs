//! Upstream chat endpoint wire types
//!
//! These match the inference server's `/api/chat` format. The same record
//! shape covers both modes: the buffered reply is one complete document and
//! the streaming body is one such document per line.

use serde::{Deserialize, Serialize};

/// Request body for the chat endpoint
#[derive(Debug, Serialize)]
pub struct ChatBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

/// One conversation turn sent upstream
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Generation parameters understood by the upstream server
#[derive(Debug, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

/// One parsed unit of the upstream response.
///
/// Every field is optional on the wire; `#[serde(default)]` keeps partial
/// records parseable.
#[derive(Debug, Deserialize)]
pub struct ChatRecord {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub message: Option<ChatReply>,

    /// Completion flag; true on the final streaming record and on the
    /// buffered single-shot document
    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub prompt_eval_count: Option<u32>,

    #[serde(default)]
    pub eval_count: Option<u32>,
}

impl ChatRecord {
    /// Incremental or complete reply text, if the record carries any
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|reply| reply.content.as_str())
            .filter(|content| !content.is_empty())
    }
}

/// The assistant message inside a [`ChatRecord`]
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: String,
}
