//! Upstream configuration.
//!
//! The upstream host is fixed at compile time. Only tests swap the base URL,
//! pointing it at a local mock server.

use std::time::Duration;

/// Baidu AI open platform.
pub const BAIDU_API_BASE: &str = "https://aip.baidubce.com";

/// Client-credentials token endpoint.
pub const TOKEN_PATH: &str = "/oauth/2.0/token";

/// Face detection v3 endpoint.
pub const FACE_DETECT_PATH: &str = "/rest/2.0/face/v3/detect";

const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
const FACE_DETECT_TIMEOUT: Duration = Duration::from_secs(15);
const PASSTHROUGH_TIMEOUT: Duration = Duration::from_secs(15);

/// Where and how long to talk to the upstream.
#[derive(Debug, Clone)]
pub struct BaiduConfig {
    /// Scheme and host, no trailing slash.
    pub base_url: String,
    pub token_timeout: Duration,
    pub face_detect_timeout: Duration,
    pub passthrough_timeout: Duration,
}

impl BaiduConfig {
    /// Same timeouts, different host.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url, TOKEN_PATH)
    }

    pub fn face_detect_url(&self) -> String {
        format!("{}{}", self.base_url, FACE_DETECT_PATH)
    }

    /// Upstream URL for a passthrough path (prefix already stripped).
    pub fn passthrough_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl Default for BaiduConfig {
    fn default() -> Self {
        Self {
            base_url: BAIDU_API_BASE.to_string(),
            token_timeout: TOKEN_TIMEOUT,
            face_detect_timeout: FACE_DETECT_TIMEOUT,
            passthrough_timeout: PASSTHROUGH_TIMEOUT,
        }
    }
}
