//! Test helpers: a throwaway upstream server and a call counter.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{body::Body, extract::DefaultBodyLimit, response::Response, Router};

use crate::baidu::{BaiduClient, BaiduConfig};
use crate::state::{RelayConfig, RelayState};

/// Counts calls that reached a mock upstream.
#[derive(Debug, Clone, Default)]
pub struct UpstreamSpy(Arc<AtomicUsize>);

impl UpstreamSpy {
    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(app: Router) -> String {
    let app = app.layer(DefaultBodyLimit::disable());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Relay state with default config, forwarding to `base_url`.
pub fn state_for(base_url: &str) -> RelayState {
    state_with(RelayConfig::default(), BaiduConfig::with_base_url(base_url))
}

pub fn state_with(config: RelayConfig, baidu: BaiduConfig) -> RelayState {
    RelayState::new(config, BaiduClient::new(baidu).unwrap())
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
