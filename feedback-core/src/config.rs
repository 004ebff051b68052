//! Upstream configuration sourced from the environment
//!
//! Configuration is read once at process start into an explicit value and
//! passed into [`UpstreamClient`](crate::upstream::UpstreamClient). A missing
//! base URL is not a startup failure: every request against an unconfigured
//! client reports [`Error::NotConfigured`] instead.

use crate::error::{Error, Result};
use std::env;

/// Environment variable holding the upstream inference server base URL
pub const ENV_BASE_URL: &str = "AI_API_BASE_URL";
/// Environment variable holding the model name sent upstream
pub const ENV_MODEL_NAME: &str = "AI_MODEL_NAME";
/// Environment variable holding the optional bearer token
pub const ENV_API_KEY: &str = "AI_API_KEY";

/// Model name used when `AI_MODEL_NAME` is unset
pub const DEFAULT_MODEL: &str = "Feedback bot";

/// Connection settings for the upstream inference server
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the inference server, e.g. `http://localhost:11434`
    pub base_url: Option<String>,

    /// Model name forwarded with every chat request
    pub model: String,

    /// Optional bearer token forwarded upstream
    pub api_key: Option<String>,
}

impl UpstreamConfig {
    /// Build a configuration from the process environment.
    ///
    /// Empty variables are treated the same as unset ones.
    pub fn from_env() -> Self {
        Self {
            base_url: non_empty_var(ENV_BASE_URL),
            model: non_empty_var(ENV_MODEL_NAME).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: non_empty_var(ENV_API_KEY),
        }
    }

    /// Build a configuration directly, for tests and embedders.
    pub fn new(base_url: Option<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url,
            model: model.into(),
            api_key,
        }
    }

    /// Whether an upstream endpoint is configured
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Full URL of the upstream chat endpoint
    pub fn chat_url(&self) -> Result<String> {
        let base = self.base_url.as_deref().ok_or(Error::NotConfigured)?;
        Ok(format!("{}/api/chat", base.trim_end_matches('/')))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
