use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Upstream response bodies are truncated to this length before they are
/// embedded in error messages.
const BODY_SNIPPET_LEN: usize = 300;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("upstream request failed with HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("eBay API reported failure: {0}")]
    UpstreamAck(String),

    #[error("token exchange failed with HTTP {status}: {body}")]
    Token { status: u16, body: String },

    #[error("failed to parse upstream response: {0}")]
    Parse(String),

    #[error("upstream request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    pub fn upstream_status(status: u16, body: &str) -> Self {
        ApiError::UpstreamStatus {
            status,
            body: truncate(body),
        }
    }

    pub fn token(status: u16, body: &str) -> Self {
        ApiError::Token {
            status,
            body: truncate(body),
        }
    }

    /// Transport-level upstream failures map to 502; everything else
    /// (configuration, parse, API-level Ack failures) is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UpstreamStatus { .. } | ApiError::Token { .. } | ApiError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LEN {
        body.to_string()
    } else {
        let mut end = BODY_SNIPPET_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(%status, error = %self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_body_is_truncated() {
        let long = "x".repeat(2000);
        match ApiError::upstream_status(503, &long) {
            ApiError::UpstreamStatus { status, body } => {
                assert_eq!(status, 503);
                assert!(body.len() <= BODY_SNIPPET_LEN + 3);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn transport_failures_are_bad_gateway() {
        assert_eq!(
            ApiError::upstream_status(500, "boom").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::MissingConfig("EBAY_APP_ID".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::UpstreamAck("bad token".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
