//! Feedback bridge core
//!
//! This crate implements the bidirectional protocol bridge behind the
//! feedback API: it forwards a client request to an upstream inference
//! server and relays the reply back either as a single buffered JSON
//! document or as an incrementally-delivered server-sent-event stream.
//!
//! The pieces, leaf-first:
//! - [`prompt`] composes the user prompt from the structured request,
//! - [`upstream`] talks to the inference server in both modes,
//! - [`relay`] splits the upstream NDJSON byte stream into ordered events,
//! - [`sse`] frames events for delivery and decodes them on the consuming
//!   side.

pub mod config;
pub mod error;
pub mod prompt;
pub mod relay;
pub mod sse;
pub mod types;
pub mod upstream;

pub use config::UpstreamConfig;
pub use error::{Error, Result};
pub use relay::{ChannelSink, EventSink, SinkClosed, StreamEvent};
pub use types::{
    GenerationOptions, GenerationRequest, GenerationResponse, HistoryMessage, Role, Usage,
};
pub use upstream::UpstreamClient;
