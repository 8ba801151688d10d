//! Server configuration and shared state.
//!
//! The relay holds no mutable state. The only thing shared across requests
//! is the outbound client.

use std::sync::Arc;

use crate::baidu::BaiduClient;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3001;

/// Browser origins allowed to call the relay with credentials.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["https://www.yuyuan.xz.cn", "http://localhost:8080"];

/// Largest accepted inbound body (10 MiB).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Exact origins that receive CORS headers.
    pub allowed_origins: Vec<String>,
    /// Forward any other `/api/baidu/*` path unchanged.
    pub passthrough: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            passthrough: false,
        }
    }
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared server state, cloned into every handler.
#[derive(Debug, Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub baidu: BaiduClient,
}

impl RelayState {
    pub fn new(config: RelayConfig, baidu: BaiduClient) -> Self {
        Self {
            config: Arc::new(config),
            baidu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
        assert_eq!(
            config.allowed_origins,
            vec!["https://www.yuyuan.xz.cn", "http://localhost:8080"]
        );
        assert!(!config.passthrough);
    }

    #[test]
    fn test_body_limit_is_ten_mebibytes() {
        assert_eq!(MAX_BODY_BYTES, 10_485_760);
    }
}
