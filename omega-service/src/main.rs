use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::info;

mod api;
mod chain;
mod config;
mod error;
mod history;
mod ollama;
mod reports;
mod storage;

use crate::api::{AppState, RouterOptions};
use crate::chain::OllamaQaChain;
use crate::ollama::OllamaClient;
use crate::reports::ReportLibrary;
use crate::storage::UploadStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("Starting Dr. Omega service v{}", env!("CARGO_PKG_VERSION"));

    let config = crate::config::load_config()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        upload_dir = %config.storage.upload_dir.display(),
        "Configuration loaded"
    );

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let store = UploadStore::new(&config.storage.upload_dir);
    store.ensure_dir().await?;

    let client = OllamaClient::new(config.ollama.clone())?;
    info!(url = %config.ollama.base_url, model = %config.ollama.model, "QA chain ready");
    let chain = OllamaQaChain::new(
        client,
        ReportLibrary::new(&config.storage.upload_dir),
        config.chain.clone(),
    );

    let state = AppState {
        store,
        chain: Arc::new(chain),
        metrics,
    };
    let app = api::router(
        state,
        RouterOptions {
            max_upload_bytes: config.storage.max_upload_bytes,
            static_dir: config.web.static_dir.clone(),
        },
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // RUST_LOG wins; default keeps request traces from tower_http visible too
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("omega_service=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
