//! Baidu AI forwarding.
//!
//! Two fixed endpoints (OAuth token issuance and face detection) are relayed
//! to `aip.baidubce.com`. An optional passthrough mirrors the web app's
//! dev-server proxy, forwarding any other `/api/baidu/*` path.

pub mod api;
pub mod client;
pub mod config;

pub use client::BaiduClient;
pub use config::BaiduConfig;
