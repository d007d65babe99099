pub mod config;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod security;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let request_timeout = Duration::from_secs(state.settings.server.request_timeout_seconds);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::chat_handler))
        .route("/memory/status", get(handlers::memory::memory_status))
        .route("/memory/clear", post(handlers::memory::memory_clear))
        .route("/vpn/proxies", get(handlers::proxy::list_proxies))
        .route("/get-proxies", get(handlers::proxy::list_proxies))
        .route("/vpn/test", get(handlers::proxy::vpn_test))
        .route("/vpn-test", get(handlers::proxy::vpn_test))
        .route("/system/status", get(handlers::health::system_status));

    Router::new()
        .route("/", get(handlers::health::index))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes)
        .fallback(handlers::health::not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(TimeoutLayer::new(request_timeout))
}
