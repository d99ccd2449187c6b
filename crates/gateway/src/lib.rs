//! HTTP API gateway for Citeweave.
//!
//! Exposes a health check and the v1 research API (search, selection,
//! context preview, section generation, chat, settings) over a shared
//! [`Workspace`]. Any browser front end can drive it.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use citeweave_config::AppConfig;
use citeweave_research::Workspace;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Request bodies larger than this are rejected.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const FALLBACK_ORIGIN: &str = "http://localhost:5173";

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - CORS restricted to `allowed_origin`
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(workspace: Arc<Workspace>, allowed_origin: &str) -> Router {
    let origin = HeaderValue::from_str(allowed_origin).unwrap_or_else(|_| {
        warn!(origin = allowed_origin, "Invalid CORS origin, using {FALLBACK_ORIGIN}");
        HeaderValue::from_static(FALLBACK_ORIGIN)
    });

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(workspace))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve the API until the process is stopped.
pub async fn start(
    config: &AppConfig,
    workspace: Arc<Workspace>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(workspace, &config.gateway.allowed_origin);

    info!(addr = %addr, origin = %config.gateway.allowed_origin, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
