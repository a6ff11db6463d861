use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use super::AppState;
use crate::error::{ConvertError, Result};
use crate::ratelimit::{client_identity, RateLimitDecision};
use crate::transcode::TranscodeJob;
use crate::utils::{check_dependencies, format_duration};

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct VideoInfoResponse {
    pub title: String,
    /// Formatted as M:SS
    pub duration: String,
    pub thumbnail: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub author: String,
}

/// POST /api/video-info - resolve and return video metadata
pub async fn video_info(
    State(state): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<VideoInfoResponse>> {
    let metadata = state.pipeline.video_info(&request.url).await?;

    Ok(Json(VideoInfoResponse {
        title: metadata.title,
        duration: format_duration(metadata.duration_secs),
        thumbnail: metadata.thumbnail,
        video_id: metadata.id.to_string(),
        author: metadata.author,
    }))
}

/// POST /api/convert - convert a video to MP3 and stream it back
pub async fn convert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UrlRequest>,
) -> Result<Response> {
    // Admission control runs before any expensive work
    let identity = client_identity(&headers);
    let decision = state
        .limiter
        .check(
            &identity,
            state.config.limits.rate_limit,
            Duration::from_secs(state.config.limits.rate_window_secs),
        )
        .await;

    if !decision.allowed {
        return Ok(rate_limited_response(&decision));
    }

    let (job, _progress) = TranscodeJob::new();
    let output = state.pipeline.convert(&request.url, &job).await?;

    let content_length = output.data.len();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", output.filename),
        )
        .header(header::CONTENT_LENGTH, content_length)
        .header("X-RateLimit-Limit", decision.limit)
        .header("X-RateLimit-Remaining", decision.remaining)
        .header("X-RateLimit-Reset", decision.reset_ms)
        .body(Body::from(output.data))
        .map_err(|e| ConvertError::Internal(format!("response assembly failed: {e}")))
}

fn rate_limited_response(decision: &RateLimitDecision) -> Response {
    let body = Json(json!({
        "error": "Too many requests",
        "retryAfter": decision.retry_after_secs,
    }));

    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            ("Retry-After", decision.retry_after_secs.to_string()),
            ("X-RateLimit-Limit", decision.limit.to_string()),
            ("X-RateLimit-Remaining", decision.remaining.to_string()),
            ("X-RateLimit-Reset", decision.reset_ms.to_string()),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub missing_tools: Vec<String>,
}

/// GET /health - liveness probe reporting external tool availability
pub async fn health() -> Json<HealthResponse> {
    let missing_tools = check_dependencies().await;
    let status = if missing_tools.is_empty() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        missing_tools,
    })
}
