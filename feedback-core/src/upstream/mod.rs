//! Client for the upstream inference server
//!
//! Two modes against the same chat endpoint: a single buffered call whose
//! reply is normalized into a [`GenerationResponse`], and a streaming call
//! whose chunked NDJSON body is pumped through the
//! [relay](crate::relay::relay) into an [`EventSink`].

pub mod types;

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};
use crate::prompt;
use crate::relay::{self, EventSink};
use crate::types::{GenerationRequest, GenerationResponse, Role, Usage};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use types::{ChatBody, ChatMessage, ChatOptions, ChatRecord};
use uuid::Uuid;

/// System instruction sent as the first turn of every chat request
pub const SYSTEM_INSTRUCTION: &str =
    "You are an AI-driven automated feedback response generator.";

/// Default sampling temperature when the caller supplies none
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Default output-length cap when the caller supplies none
pub const DEFAULT_MAX_TOKENS: u32 = 400;

/// HTTP client for the upstream inference server.
///
/// Owns one pooled connection client for the process; each request owns its
/// upstream connection exclusively for the request's lifetime. Only a
/// connect timeout is set, so long-running streams are never cut off by the
/// client itself.
pub struct UpstreamClient {
    config: UpstreamConfig,
    http: Client,
}

impl UpstreamClient {
    /// Create a client around an already-loaded configuration
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    fn chat_body(&self, request: &GenerationRequest, stream: bool) -> ChatBody {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage::new("system", SYSTEM_INSTRUCTION));
        for turn in &request.history {
            let role = match turn.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(ChatMessage::new(role, turn.content.clone()));
        }
        messages.push(ChatMessage::new("user", prompt::compose(request)));

        let options = request.options.clone().unwrap_or_default();
        ChatBody {
            model: self.config.model.clone(),
            messages,
            stream,
            options: ChatOptions {
                temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                num_predict: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            },
        }
    }

    /// Issue the chat call and fail on any non-success status.
    ///
    /// Configuration and validation are checked here, before any network
    /// traffic.
    async fn send_chat(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response> {
        request.validate()?;
        let url = self.config.chat_url()?;
        let body = self.chat_body(request, stream);
        tracing::debug!(%url, stream, "sending upstream chat request");

        let mut call = self.http.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Single-shot generation: one buffered request, one normalized reply
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let response = self.send_chat(request, false).await?;
        let record: ChatRecord = response.json().await?;

        let prompt_tokens = record.prompt_eval_count.unwrap_or(0);
        let completion_tokens = record.eval_count.unwrap_or(0);
        Ok(GenerationResponse {
            id: record
                .id
                .unwrap_or_else(|| format!("req_{}", Uuid::new_v4().simple())),
            model: self.config.model.clone(),
            output: record.message.map(|reply| reply.content).unwrap_or_default(),
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                // Counts come off the wire; never trust them to sum in range
                total_tokens: prompt_tokens.saturating_add(completion_tokens),
            }),
        })
    }

    /// Streaming generation: pump upstream records into the sink as they
    /// arrive.
    ///
    /// Never returns an error to the caller; any failure before the first
    /// byte reaches `sink.on_error`, so the consumer always observes a
    /// terminal event. A [`SinkClosed`](crate::relay::SinkClosed) outcome
    /// means the consumer went away and is dropped silently.
    pub async fn stream(&self, request: &GenerationRequest, sink: &mut dyn EventSink) {
        match self.send_chat(request, true).await {
            Ok(response) => {
                let meta = json!({ "model": self.config.model });
                let body = Box::pin(response.bytes_stream());
                let _ = relay::relay(body, sink, meta).await;
            }
            Err(err) => {
                tracing::debug!("stream request failed before relay: {err}");
                let _ = sink.on_error(err.to_string()).await;
            }
        }
    }
}
