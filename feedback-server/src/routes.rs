//! Route handlers for the feedback API

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use feedback_core::relay::ChannelSink;
use feedback_core::{
    sse, Error, GenerationRequest, GenerationResponse, UpstreamClient,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Per-event channel capacity for one streaming request
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    client: Arc<UpstreamClient>,
    started: Instant,
}

impl AppState {
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client: Arc::new(client),
            started: Instant::now(),
        }
    }
}

/// Create the axum router with all API routes and middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/feedback/generate", post(generate))
        .route("/api/feedback/stream", get(stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
    model: String,
    upstream_configured: bool,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.client.config();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        model: config.model.clone(),
        upstream_configured: config.is_configured(),
    })
}

/// Single-shot generation: one buffered JSON reply
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    request.validate()?;
    let response = state.client.generate(&request).await?;
    Ok(Json(response))
}

/// Query parameters accepted by the streaming endpoint
#[derive(Debug, Default, Deserialize)]
struct StreamParams {
    #[serde(default)]
    message: String,
    context: Option<String>,
    tone: Option<String>,
    language: Option<String>,
}

impl StreamParams {
    fn into_request(self) -> GenerationRequest {
        GenerationRequest {
            message: self.message,
            context: self.context,
            tone: self.tone,
            language: self.language,
            ..GenerationRequest::default()
        }
    }
}

/// Streaming generation delivered as server-sent events.
///
/// Validation failures are reported as a JSON 400 before any streaming
/// begins; once the SSE response is open, every outcome ends in a terminal
/// `done` or `error` block. One relay task is spawned per request; when
/// the client disconnects the response body is dropped, the channel
/// receiver closes, and the relay releases the upstream connection.
async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<Response, ApiError> {
    let request = params.into_request();
    request.validate()?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let client = state.client.clone();
    tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx);
        client.stream(&request, &mut sink).await;
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(|event| {
        Ok::<_, Infallible>(Bytes::from(sse::encode_event(&event)))
    }));
    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}

/// Error wrapper mapping the core taxonomy onto HTTP statuses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotConfigured => StatusCode::NOT_IMPLEMENTED,
            Error::Upstream { .. } | Error::Network(_) => StatusCode::BAD_GATEWAY,
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}
