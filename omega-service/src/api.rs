//! HTTP API for the Dr. Omega service.
//!
//! Routes:
//! - `POST /upload/`: store a report file
//! - `POST /chat/`: ask the QA chain a question
//! - `GET /status/`: fixed liveness payload
//! - `GET /metrics`: Prometheus metrics
//!
//! When a static directory is configured, the chat page is served as the
//! fallback.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chain::QaChain;
use crate::storage::UploadStore;

pub mod chat;
pub mod upload;
use chat::chat_handler;
use upload::upload_handler;

/// Name reported by the status route
pub const SERVICE_NAME: &str = "Dr. Omega";

/// Application state
pub struct AppState {
    pub store: UploadStore,
    pub chain: Arc<dyn QaChain>,
    pub metrics: PrometheusHandle,
}

/// Router options that do not live in shared state
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    pub max_upload_bytes: usize,
    pub static_dir: Option<PathBuf>,
}

/// Build the API router
pub fn router(state: AppState, options: RouterOptions) -> Router {
    let state = Arc::new(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload = post(upload_handler).layer(DefaultBodyLimit::max(options.max_upload_bytes));

    let mut app = Router::new()
        .route("/upload/", upload.clone())
        .route("/upload", upload)
        .route("/chat/", post(chat_handler))
        .route("/chat", post(chat_handler))
        .route("/status/", get(status_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler));

    if let Some(dir) = options.static_dir {
        info!(dir = %dir.display(), "Serving chat page");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Status & Metrics ===

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: &'static str,
    service: &'static str,
}

async fn status_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Running",
        service: SERVICE_NAME,
    })
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
