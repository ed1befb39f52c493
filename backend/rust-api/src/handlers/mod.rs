use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::metrics;
use crate::services::repository::StoreError;
use crate::services::AppState;

pub mod error;
pub mod questions;
pub mod relay;
pub mod review;
pub mod sessions;
pub mod stats;
pub mod taxonomy;

fn dependency_health(result: Result<(), StoreError>, ok_message: &str) -> (bool, Value) {
    match result {
        Ok(()) => (true, json!({ "status": "healthy", "message": ok_message })),
        Err(err) => (false, json!({ "status": "unhealthy", "error": err.to_string() })),
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = Map::new();

    let (db_ok, db) = dependency_health(
        state.repository.ping().await,
        "Question store reachable",
    );
    dependencies.insert("database".to_string(), db);

    let (sessions_ok, sessions) = dependency_health(
        state.sessions.ping().await,
        "Session store reachable",
    );
    dependencies.insert("sessions".to_string(), sessions);

    let all_healthy = db_ok && sessions_ok;
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": if all_healthy { "healthy" } else { "degraded" },
            "service": "aprueba-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// HTTP Basic auth for `/metrics`, checked against `metrics.auth` (`user:password`).
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
