//! Render orchestration
//!
//! One request runs strictly in sequence, stopping at the first failure:
//! 1. Request checks: config present, template known, audio list well formed
//!    (before any other work)
//! 2. Bundle the composition source
//! 3. Select a browser strategy and acquire a lease
//! 4. Discover compositions and pick the template's composition
//! 5. Resolve audio durations
//! 6. Render into a fresh temporary artifact
//!
//! The browser lease is released exactly once after step 6, whatever the
//! outcome. The returned artifact is streamed by the HTTP layer.

use crate::artifact::RenderArtifact;
use crate::audio::AudioDurationResolver;
use crate::browser::{BrowserLease, BrowserProvider, StrategySelector};
use crate::engine::{BundleRef, CompositionEngine, RenderJob};
use crate::error::{RenderError, RenderStage};
use ayah_common::config::{EngineSettings, ServiceConfig};
use ayah_common::{InputProps, RenderRequest, Template};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct RenderOrchestrator {
    engine: Arc<dyn CompositionEngine>,
    browsers: Arc<dyn BrowserProvider>,
    selector: StrategySelector,
    audio: AudioDurationResolver,
    settings: EngineSettings,
    limiter: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
}

impl RenderOrchestrator {
    pub fn new(
        config: &ServiceConfig,
        engine: Arc<dyn CompositionEngine>,
        browsers: Arc<dyn BrowserProvider>,
        selector: StrategySelector,
        audio: AudioDurationResolver,
    ) -> Self {
        Self {
            engine,
            browsers,
            selector,
            audio,
            settings: config.engine.clone(),
            limiter: config
                .limits
                .max_concurrent_renders
                .map(|permits| Arc::new(Semaphore::new(permits))),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Renders currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Browser leases currently held
    pub fn browser_connections(&self) -> usize {
        self.browsers.active_connections()
    }

    pub async fn render(&self, request: RenderRequest) -> Result<RenderArtifact, RenderError> {
        let RenderRequest { ayahs, config } = request;
        let config = config
            .ok_or_else(|| RenderError::failed(RenderStage::Request, "config is missing"))?;
        let template = config.template().ok_or_else(|| RenderError::InvalidTemplate {
            requested: config.requested_template(),
        })?;
        let audio_urls = config
            .audio_urls()
            .map_err(|e| RenderError::failed(RenderStage::Request, e))?
            .to_vec();

        // The limiter is never closed, so acquisition only waits
        let _permit = match &self.limiter {
            Some(limiter) => limiter.clone().acquire_owned().await.ok(),
            None => None,
        };
        let _in_flight = InFlight::enter(&self.in_flight);
        let started = Instant::now();

        let bundle = self
            .engine
            .bundle(&self.settings.composition_entry, &self.settings.bundle_out_dir)
            .await
            .map_err(|e| RenderError::failed(RenderStage::Bundle, e))?;
        info!(serve_url = %bundle.serve_url, "Bundle ready");

        let strategy = self.selector.select();
        info!(strategy = strategy.name(), connection = %strategy, "Selected browser strategy");
        let lease = self
            .browsers
            .acquire(&strategy)
            .await
            .map_err(|e| RenderError::failed(RenderStage::Browser, e))?;

        let input_props = InputProps::new(ayahs, config);
        let outcome = self
            .render_with_browser(&bundle, &lease, template, input_props, &audio_urls)
            .await;
        lease.release();

        match &outcome {
            Ok(artifact) => info!(
                template = %template,
                output = %artifact.path().display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Render completed"
            ),
            Err(e @ RenderError::InvalidTemplate { .. }) => {
                warn!(template = %template, error = %e, "Render rejected")
            }
            Err(e) => error!(template = %template, error = %e, "Render error"),
        }
        outcome
    }

    async fn render_with_browser(
        &self,
        bundle: &BundleRef,
        lease: &BrowserLease,
        template: Template,
        input_props: InputProps,
        audio_urls: &[Value],
    ) -> Result<RenderArtifact, RenderError> {
        let compositions = self
            .engine
            .compositions(bundle, lease.options(), &input_props)
            .await
            .map_err(|e| RenderError::failed(RenderStage::Discovery, e))?;

        let composition_id = template.composition_id();
        let composition = compositions
            .into_iter()
            .find(|c| c.id == composition_id)
            .ok_or_else(|| {
                warn!(composition = composition_id, "Composition not exposed by bundle");
                RenderError::InvalidTemplate {
                    requested: Some(template.to_string()),
                }
            })?;

        let durations = self.audio.resolve_all(audio_urls).await;
        let input_props = input_props.with_audio_durations(durations);

        let artifact = RenderArtifact::allocate(&self.settings.temp_dir)
            .map_err(|e| RenderError::failed(RenderStage::Render, e))?;
        let job = RenderJob::h264(
            bundle,
            composition,
            artifact.path().to_path_buf(),
            input_props,
            lease.options().clone(),
            self.settings.verbose,
        );

        info!(
            composition = composition_id,
            connection = lease.target(),
            output = %artifact.path().display(),
            "Rendering"
        );
        // On failure the artifact drops here and its file is removed
        self.engine
            .render(&job)
            .await
            .map_err(|e| RenderError::failed(RenderStage::Render, e))?;

        Ok(artifact)
    }
}

/// Counts a render as in flight until dropped
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
