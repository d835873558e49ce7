pub mod config;
mod error;
pub mod fetcher;
pub mod helpers;
pub mod logging;
pub mod poller;
mod routes;
mod validation;

pub use config::Config;
pub use routes::{API_VERSION, AVAILABLE_ENDPOINTS};

use axum::{
    Router,
    handler::HandlerWithoutStateExt,
    http::{HeaderValue, StatusCode, header},
    routing::get,
};
use fivemon_store::Store;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    style-src 'self' 'unsafe-inline' https://cdnjs.cloudflare.com; \
    script-src 'self' 'unsafe-inline' https://cdnjs.cloudflare.com; \
    script-src-attr 'unsafe-inline'; \
    img-src 'self' data: https:; \
    connect-src 'self'; \
    font-src 'self' https://cdnjs.cloudflare.com";

pub struct AppState {
    pub store: Store,
    /// Monitored game server, as shown to clients
    pub server_address: String,
    pub max_players: u32,
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per minute per client IP
    pub per_min: u64,
    /// Burst size
    pub burst: u32,
}

impl RateLimitConfig {
    /// Interval after which one request of quota is replenished
    fn replenish_interval_ms(&self) -> u64 {
        60_000 / self.per_min.max(1)
    }
}

impl From<&Config> for RateLimitConfig {
    fn from(config: &Config) -> Self {
        Self {
            per_min: config.rate_limit_per_min,
            burst: config.rate_limit_burst,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Create the application router over the given store and configuration
pub fn create_app(store: Store, config: &Config) -> Router {
    let state = Arc::new(AppState {
        store,
        server_address: config.upstream_address.clone(),
        max_players: config.max_players,
    });
    let rate_limit = RateLimitConfig::from(config);

    // Per-IP limit shared by every route
    let governor = GovernorConfigBuilder::default()
        .per_millisecond(rate_limit.replenish_interval_ms().max(1))
        .burst_size(rate_limit.burst.max(1))
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("rate limit quota is non-zero");

    let api_routes = Router::new()
        .route("/api/server-info", get(routes::server_info))
        .route("/api/players", get(routes::players))
        .route("/api/search/{query}", get(routes::search))
        .route("/api/status", get(routes::status))
        .route("/api/history", get(routes::history))
        .route("/api/test", get(routes::api_test));

    // Dashboard assets; anything else gets the JSON 404
    let static_files = ServeDir::new(&config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(routes::not_found.into_service());

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(api_routes)
        .fallback_service(static_files)
        .layer(GovernorLayer::new(governor).error_handler(error::rate_limit_response))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(config.request_body_limit))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
