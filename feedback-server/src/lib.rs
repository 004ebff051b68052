//! HTTP surface of the feedback bridge
//!
//! Thin axum scaffolding around [`feedback_core`]: routing, status mapping,
//! and the SSE response plumbing. All protocol logic lives in the core
//! crate.

pub mod routes;

pub use routes::{router, AppState};
