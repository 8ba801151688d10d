//! Router assembly and the relay-wide middleware stack.
//!
//! Layer order, outermost first: request tracing, CORS, body limit, panic
//! catcher. Unknown routes, and known routes hit with the wrong method, fall
//! through to a JSON 404.

use std::any::Any;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, Request, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::baidu::api;
use crate::error::RelayError;
use crate::protocol::HealthResponse;
use crate::state::{RelayConfig, RelayState, MAX_BODY_BYTES};

/// Build the relay application.
pub fn create_router(state: RelayState) -> Router {
    let mut routes = Router::new()
        .route("/health", get(health_handler).fallback(not_found))
        .route(
            "/api/baidu/oauth/2.0/token",
            get(api::token).fallback(not_found),
        )
        .route(
            "/api/baidu/rest/2.0/face/v3/detect",
            post(api::detect_face).fallback(not_found),
        );

    if state.config.passthrough {
        routes = routes.route("/api/baidu/*path", any(api::passthrough));
    }

    let config = state.config.clone();
    with_middleware(routes.fallback(not_found).with_state(state), &config)
}

/// Wrap `router` in the shared middleware stack.
pub fn with_middleware(router: Router, config: &RelayConfig) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(cors_layer(&config.allowed_origins))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

/// CORS for an exact origin allowlist, credentials allowed.
///
/// Requests from other origins get no CORS headers at all and are left for
/// the browser to refuse.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = origin.as_str(), "Ignoring malformed allowed origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Span per request. Records method and path only; query strings carry
/// client secrets.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = request.uri().path()
    )
}

/// Turn a handler panic into the standard 500 envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = detail.as_str(), "Server error");
    RelayError::Internal(detail).into_response()
}

// ── Route Handlers ────────────────────────────────────────────────────────────

/// Liveness check. Always 200.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn not_found(method: Method, uri: Uri) -> RelayError {
    RelayError::NotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
