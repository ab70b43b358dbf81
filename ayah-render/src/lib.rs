//! ayah-render library
//!
//! HTTP service that renders ayah videos: bundles the composition source,
//! obtains a browser, discovers the requested template, resolves audio
//! durations, renders an MP4 and streams it back.

pub mod api;
pub mod artifact;
pub mod audio;
pub mod browser;
pub mod cli;
pub mod engine;
pub mod error;
pub mod orchestrator;

pub use crate::error::{ApiError, ApiResult, RenderError, RenderStage};
pub use crate::orchestrator::RenderOrchestrator;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use ayah_common::config::ServiceConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Immutable service configuration
    pub config: Arc<ServiceConfig>,
    /// Render pipeline
    pub orchestrator: Arc<RenderOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last render failure for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: Arc<ServiceConfig>, orchestrator: Arc<RenderOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.limits.body_limit_bytes;

    Router::new()
        .merge(api::render_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
