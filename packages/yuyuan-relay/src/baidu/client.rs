//! Outbound HTTP client for the Baidu AI platform.
//!
//! One `reqwest::Client` (and its connection pool) is shared by every
//! request. Each call carries its own timeout; there is no retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode};
use reqwest::header::CONTENT_TYPE;
use serde::de::IgnoredAny;

use super::config::BaiduConfig;
use crate::error::UpstreamError;
use crate::protocol::{FaceDetectRequest, TokenParams, TokenQuery};

/// Raw upstream answer relayed by the passthrough.
#[derive(Debug)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Handle to the upstream, cheap to clone.
#[derive(Debug, Clone)]
pub struct BaiduClient {
    http: reqwest::Client,
    config: Arc<BaiduConfig>,
}

impl BaiduClient {
    /// Build the shared client.
    pub fn new(config: BaiduConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("yuyuan-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// `GET /oauth/2.0/token` with `grant_type=client_credentials`.
    ///
    /// Returns the upstream JSON body untouched.
    pub async fn fetch_token(&self, query: &TokenQuery) -> Result<Bytes, UpstreamError> {
        let timeout = self.config.token_timeout;
        let started = Instant::now();

        let response = self
            .http
            .get(self.config.token_url())
            .query(&TokenParams::client_credentials(query))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, timeout.as_millis()))?;

        let body = read_json(response, timeout).await?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Token upstream answered"
        );
        Ok(body)
    }

    /// `POST /rest/2.0/face/v3/detect?access_token=...` with the image
    /// fields as a JSON body.
    pub async fn detect_face(&self, request: FaceDetectRequest) -> Result<Bytes, UpstreamError> {
        let timeout = self.config.face_detect_timeout;
        let started = Instant::now();
        let (access_token, payload) = request.into_parts();

        let mut builder = self.http.post(self.config.face_detect_url());
        if let Some(token) = access_token.as_deref() {
            builder = builder.query(&[("access_token", token)]);
        }

        let response = builder
            .json(&payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, timeout.as_millis()))?;

        let body = read_json(response, timeout).await?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Face detect upstream answered"
        );
        Ok(body)
    }

    /// Forward an arbitrary request, returning whatever the upstream said.
    ///
    /// Only transport failures are errors here; upstream statuses pass
    /// through unchanged.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        content_type: Option<HeaderValue>,
        body: Bytes,
    ) -> Result<ForwardedResponse, UpstreamError> {
        let timeout = self.config.passthrough_timeout;
        let url = self.config.passthrough_url(path, query);

        let mut builder = self.http.request(method, url).timeout(timeout);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, timeout.as_millis()))?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, timeout.as_millis()))?;

        Ok(ForwardedResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Accept a 2xx JSON answer, keeping its bytes exactly as sent.
async fn read_json(response: reqwest::Response, timeout: Duration) -> Result<Bytes, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| UpstreamError::from_reqwest(e, timeout.as_millis()))?;

    serde_json::from_slice::<IgnoredAny>(&body)
        .map_err(|e| UpstreamError::InvalidBody(e.to_string()))?;

    Ok(body)
}
