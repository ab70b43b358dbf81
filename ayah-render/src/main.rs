//! ayah-render - Ayah video render service
//!
//! Serves POST /render-video: renders ayah content through an external
//! composition engine and streams the resulting MP4 back to the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ayah_common::config::{load_toml_config, ServiceConfig};
use ayah_render::audio::AudioDurationResolver;
use ayah_render::browser::{DevToolsBrowserProvider, StrategySelector};
use ayah_render::cli::Cli;
use ayah_render::engine::WorkerEngine;
use ayah_render::{build_router, AppState, RenderOrchestrator};

/// Timeout for the remote browser handshake
const BROWSER_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ayah_render=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ayah-render v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let toml = load_toml_config(cli.config.as_deref())?;
    let config = Arc::new(ServiceConfig::resolve(cli.overrides(), toml)?);

    info!("Composition entry: {}", config.engine.composition_entry.display());
    info!("Temp dir: {}", config.engine.temp_dir.display());
    match config.limits.max_concurrent_renders {
        Some(limit) => info!("Render limit: {} concurrent", limit),
        None => info!("Render limit: none"),
    }

    let selector = StrategySelector::new(&config.browser);
    info!("Browser strategy: {}", selector.select());

    let audio = AudioDurationResolver::new(
        Duration::from_secs(config.limits.audio_fetch_timeout_secs),
        config.limits.audio_max_bytes,
    )
    .context("Failed to build audio HTTP client")?;
    let browsers = DevToolsBrowserProvider::new(BROWSER_CONNECT_TIMEOUT)
        .context("Failed to build browser HTTP client")?;
    let engine = WorkerEngine::from_settings(&config.engine);

    let orchestrator = RenderOrchestrator::new(
        &config,
        Arc::new(engine),
        Arc::new(browsers),
        selector,
        audio,
    );

    let state = AppState::new(config.clone(), Arc::new(orchestrator));
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("ayah-render listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
