//! Yuyuan Relay Server
//!
//! A small HTTP relay for the Yuyuan family site. The browser cannot call
//! the Baidu AI platform directly (no CORS), so the relay:
//!
//! 1. **Issues tokens**: forwards client-credential exchanges to
//!    `aip.baidubce.com/oauth/2.0/token`.
//!
//! 2. **Detects faces**: forwards face-detection requests to
//!    `aip.baidubce.com/rest/2.0/face/v3/detect`.
//!
//! 3. **Answers CORS** for a fixed allowlist of site origins.
//!
//! The relay is stateless: nothing is cached, stored or retried, and every
//! failure comes back as the same JSON error envelope.

mod baidu;
mod error;
mod protocol;
mod router;
mod state;
#[cfg(test)]
mod testing;

use clap::Parser;
use tokio::signal;

use baidu::{BaiduClient, BaiduConfig};
use state::{RelayConfig, RelayState, DEFAULT_ALLOWED_ORIGINS, DEFAULT_PORT};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "yuyuan-relay", version, about = "Yuyuan Baidu AI relay server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Browser origins allowed to call the relay (comma-separated).
    /// Defaults to the production site and the local dev server.
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Forward any other /api/baidu/* path to the upstream with the prefix
    /// stripped, like the web app's dev-server proxy.
    #[arg(long, env = "BAIDU_PASSTHROUGH")]
    passthrough: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        let mut allowed_origins: Vec<String> = self
            .allowed_origins
            .into_iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        if allowed_origins.is_empty() {
            allowed_origins = DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect();
        }

        RelayConfig {
            host: self.host,
            port: self.port,
            allowed_origins,
            passthrough: self.passthrough,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "yuyuan_relay=info,tower_http=info".into());

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = args.into_config();

    let baidu = match BaiduClient::new(BaiduConfig::default()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build upstream HTTP client");
            std::process::exit(1);
        }
    };

    let addr = config.bind_addr();
    let port = config.port;
    tracing::info!(port, "Yuyuan relay server starting on {}", addr);
    tracing::info!(
        origins = config.allowed_origins.join(", ").as_str(),
        "Allowed origins"
    );
    tracing::info!("Health check: http://localhost:{}/health", port);
    if config.passthrough {
        tracing::info!("Baidu AI passthrough enabled for /api/baidu/*");
    }

    let app = router::create_router(RelayState::new(config, baidu));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = addr.as_str(), error = %e, "Failed to bind address");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Relay stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
