//! Error types for the feedback bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can surface from a single generation request.
///
/// Malformed intermediate records in a stream are deliberately not
/// represented here: the relay recovers from them locally by discarding
/// the record, so they never propagate.
#[derive(Debug, Error)]
pub enum Error {
    /// Client input failed validation
    #[error("invalid request: {0}")]
    Validation(String),

    /// No upstream endpoint configured; reportable per request, the
    /// process keeps serving
    #[error("upstream base URL is not configured")]
    NotConfigured,

    /// Upstream inference server replied with a non-success status
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure talking to the upstream or the stream source
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Error::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Error::Network(err.to_string())
        }
    }
}
