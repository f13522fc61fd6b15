//! ferryd — Ferry upload server.

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use ferry_api::ApiState;
use ferry_core::config::FerryConfig;
use ferry_services::{UploadOrchestrator, UploadSettings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = FerryConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = FerryConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FerryConfig::default()
    });

    let upload_dir = &config.server.upload_dir;
    std::fs::create_dir_all(upload_dir)
        .with_context(|| format!("failed to create upload dir {}", upload_dir.display()))?;
    tracing::info!(path = %upload_dir.display(), "upload directory ready");

    let addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let state = ApiState::new(UploadOrchestrator::new(UploadSettings::from_config(&config)));

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
    };

    ferry_api::serve(state, listener, shutdown).await
}
