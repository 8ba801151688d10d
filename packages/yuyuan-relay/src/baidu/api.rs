//! Baidu AI relay handlers.
//!
//! - `GET  /api/baidu/oauth/2.0/token?client_id=..&client_secret=..`  — token issuance
//! - `POST /api/baidu/rest/2.0/face/v3/detect`                         — face detection
//! - `ANY  /api/baidu/*path`                                           — passthrough (opt-in)
//!
//! Successful upstream bodies are returned byte-for-byte with status 200.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Path, Query, RawQuery, State,
    },
    http::{header, HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
};

use crate::error::RelayError;
use crate::protocol::{FaceDetectRequest, TokenQuery};
use crate::state::RelayState;

/// Wrap an upstream JSON body in a 200 response without re-encoding it.
fn json_response(body: Bytes) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        )],
        body,
    )
        .into_response()
}

/// Whether the request declares a JSON body (`application/json` or any
/// `+json` media type).
fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Exchange client credentials for an access token.
///
/// GET /api/baidu/oauth/2.0/token?client_id=...&client_secret=...
pub async fn token(
    State(state): State<RelayState>,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Response, RelayError> {
    let Query(query) = query?;

    tracing::info!("Fetching Baidu AI token");
    match state.baidu.fetch_token(&query).await {
        Ok(body) => {
            tracing::info!("Baidu AI token fetched");
            Ok(json_response(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch Baidu AI token");
            Err(RelayError::Token(e))
        }
    }
}

/// Run face detection on an image.
///
/// POST /api/baidu/rest/2.0/face/v3/detect
/// Body: { "access_token", "image", "image_type", "face_field", "face_type" }
///
/// A missing or non-JSON body is forwarded as an empty request; the upstream
/// answers with its own error.
pub async fn detect_face(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError> {
    let body = body?;
    let request = FaceDetectRequest::from_body(has_json_content_type(&headers), &body)?;

    tracing::info!("Calling face detection API");
    match state.baidu.detect_face(request).await {
        Ok(body) => {
            tracing::info!("Face detection API call succeeded");
            Ok(json_response(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "Face detection failed");
            Err(RelayError::FaceDetect(e))
        }
    }
}

/// Forward any other `/api/baidu/*` request with the prefix stripped.
///
/// Mirrors the web app's dev-server proxy: method, query string,
/// `Content-Type` and body go upstream; status, `Content-Type` and body come
/// back unchanged.
pub async fn passthrough(
    State(state): State<RelayState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError> {
    let body = body?;
    let content_type = headers.get(header::CONTENT_TYPE).cloned();

    tracing::info!(method = %method, path = path.as_str(), "Proxying Baidu AI request");
    let forwarded = state
        .baidu
        .forward(method, &path, query.as_deref(), content_type, body)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Proxy request failed");
            RelayError::Passthrough(e)
        })?;

    tracing::info!(status = forwarded.status.as_u16(), "Proxy request answered");
    let mut response = (forwarded.status, forwarded.body).into_response();
    if let Some(content_type) = forwarded.content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}
