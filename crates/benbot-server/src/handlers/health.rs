use axum::{extract::State, http::Uri, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;
use crate::utils::error::ApiError;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
    version: String,
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "BenBot",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/chat",
            "GET /api/memory/status",
            "POST /api/memory/clear",
            "GET /api/vpn/proxies",
            "GET /api/vpn/test",
            "GET /api/system/status",
            "GET /health"
        ]
    }))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: state.clock.now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let now = state.clock.now();
    let server = &state.settings.server;
    let environment = if server.is_development() { "development" } else { "production" };

    Json(json!({
        "application": {
            "name": "BenBot",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": environment,
            "uptimeSeconds": (now - state.started_at).num_seconds(),
        },
        "llm": {
            "configured": state.llm.is_configured(),
            "model": state.llm.model_name(),
        },
        "proxy": {
            "proxiesAvailable": state.proxy_pool.cached_len(),
            "cacheAgeSeconds": state.proxy_pool.cache_age().map_or(0, |age| age.num_seconds()),
        },
        "sessions": state.session_store.stats(),
        "timestamp": now,
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route not found: {}", uri.path()))
}
