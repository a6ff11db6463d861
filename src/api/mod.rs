use anyhow::Context;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `POST /api/video-info` - Resolve video metadata
/// - `POST /api/convert` - Convert a video to MP3 (rate limited)
/// - `GET /health` - Health check reporting external tool availability
pub fn create_router(state: AppState) -> Router {
    // Pre-flight policy: any origin, POST/OPTIONS, Content-Type header
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/video-info", post(routes::video_info))
        .route("/api/convert", post(routes::convert))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve the API until the process is stopped.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, create_router(state))
        .await
        .context("API server error")?;

    Ok(())
}
