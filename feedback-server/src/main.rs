//! Feedback bridge API server

use anyhow::Result;
use feedback_core::{UpstreamClient, UpstreamConfig};
use feedback_server::{router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = UpstreamConfig::from_env();
    if !config.is_configured() {
        tracing::warn!(
            "AI_API_BASE_URL is not set; generation requests will report 501 until it is"
        );
    }
    let client = UpstreamClient::new(config)?;
    let app = router(AppState::new(client));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("feedback API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
