use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ConvertError;

/// Map classified pipeline errors onto HTTP responses.
///
/// The body carries the sanitized public message only; upstream error
/// text stays in the logs.
impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::info!(code = self.error_code(), "request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_follow_the_taxonomy() {
        let cases = [
            (ConvertError::InvalidUrl("x".into()), 400),
            (
                ConvertError::DurationExceeded {
                    duration_secs: 601,
                    limit_secs: 600,
                },
                400,
            ),
            (ConvertError::NotFound, 404),
            (ConvertError::PrivateOrRestricted, 403),
            (ConvertError::RateLimited { retry_after_secs: 9 }, 429),
            (ConvertError::TranscodeFailed("x".into()), 500),
            (ConvertError::Internal("x".into()), 500),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status().as_u16(), expected);
        }
    }
}
