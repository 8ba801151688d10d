//! Relay error types.
//!
//! Every failure, whatever its cause, reaches the caller as an
//! [`ErrorEnvelope`]. Upstream credential errors and network failures are
//! deliberately not told apart: both surface as a 500.

use axum::{
    extract::rejection::{BytesRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::protocol::ErrorEnvelope;

/// Envelope label for token failures.
pub const TOKEN_FAILED: &str = "获取token失败";
/// Envelope label for face-detection failures.
pub const FACE_DETECT_FAILED: &str = "人脸识别失败";
/// Envelope label for passthrough transport failures.
pub const PROXY_FAILED: &str = "代理请求失败";
/// Envelope label for anything caught by the catch-all handlers.
pub const INTERNAL_ERROR: &str = "服务器内部错误";
/// Envelope label for unknown routes.
pub const NOT_FOUND: &str = "接口不存在";

/// Why an outbound call to the Baidu AI platform failed.
///
/// Display strings never include the upstream URL: it carries client
/// secrets and access tokens in its query string.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The per-call timeout elapsed before the upstream answered.
    #[error("timeout of {0}ms exceeded")]
    Timeout(u128),

    /// The upstream answered with a non-2xx status.
    #[error("Request failed with status code {0}")]
    Status(u16),

    /// Connection, TLS or protocol failure.
    #[error("{0}")]
    Transport(String),

    /// A 2xx answer whose body is not JSON.
    #[error("invalid upstream response: {0}")]
    InvalidBody(String),
}

impl UpstreamError {
    /// Classify a `reqwest` failure for a call bounded by `timeout_ms`.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u128) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout_ms);
        }
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        Self::Transport(describe(&err.without_url()))
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Errors produced while handling an inbound request.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Forwarding the token request failed.
    #[error(transparent)]
    Token(UpstreamError),

    /// Forwarding the face-detection request failed.
    #[error(transparent)]
    FaceDetect(UpstreamError),

    /// The dev-proxy passthrough could not reach the upstream.
    #[error(transparent)]
    Passthrough(UpstreamError),

    /// Inbound body exceeded the configured limit. Reported like any other
    /// caught fault: 500 with the generic label.
    #[error("request entity too large")]
    PayloadTooLarge,

    /// No route matched.
    #[error("Cannot {method} {path}")]
    NotFound { method: String, path: String },

    /// Anything else that went wrong while handling the request.
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    /// The fixed `error` label of the envelope.
    pub fn label(&self) -> &'static str {
        match self {
            RelayError::Token(_) => TOKEN_FAILED,
            RelayError::FaceDetect(_) => FACE_DETECT_FAILED,
            RelayError::Passthrough(_) => PROXY_FAILED,
            RelayError::NotFound { .. } => NOT_FOUND,
            RelayError::PayloadTooLarge | RelayError::Internal(_) => INTERNAL_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Token(_)
            | RelayError::FaceDetect(_)
            | RelayError::PayloadTooLarge
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Passthrough(_) => StatusCode::BAD_GATEWAY,
            RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.label(), self.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

impl From<BytesRejection> for RelayError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return RelayError::PayloadTooLarge;
        }
        RelayError::Internal(rejection.body_text())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Internal(err.to_string())
    }
}

impl From<QueryRejection> for RelayError {
    fn from(rejection: QueryRejection) -> Self {
        RelayError::Internal(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_failures_collapse_to_500() {
        let timeout = RelayError::Token(UpstreamError::Timeout(10_000));
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let unauthorized = RelayError::Token(UpstreamError::Status(401));
        assert_eq!(unauthorized.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let refused = RelayError::FaceDetect(UpstreamError::Transport("refused".into()));
        assert_eq!(refused.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_labels_per_endpoint() {
        assert_eq!(
            RelayError::Token(UpstreamError::Status(500)).label(),
            "获取token失败"
        );
        assert_eq!(
            RelayError::FaceDetect(UpstreamError::Status(500)).label(),
            "人脸识别失败"
        );
        assert_eq!(RelayError::Internal("x".into()).label(), "服务器内部错误");
        assert_eq!(RelayError::PayloadTooLarge.label(), "服务器内部错误");
    }

    #[test]
    fn test_upstream_messages() {
        assert_eq!(
            UpstreamError::Timeout(15_000).to_string(),
            "timeout of 15000ms exceeded"
        );
        assert_eq!(
            UpstreamError::Status(403).to_string(),
            "Request failed with status code 403"
        );
        // The wrapper adds nothing to the upstream description.
        let err = RelayError::FaceDetect(UpstreamError::Timeout(15_000));
        assert_eq!(err.envelope().message, "timeout of 15000ms exceeded");
    }

    #[test]
    fn test_payload_too_large_is_reported_as_500() {
        let err = RelayError::PayloadTooLarge;
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.envelope().error, "服务器内部错误");
        assert_eq!(err.to_string(), "request entity too large");
    }

    #[test]
    fn test_not_found_message() {
        let err = RelayError::NotFound {
            method: "GET".into(),
            path: "/nope".into(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Cannot GET /nope");
    }
}
