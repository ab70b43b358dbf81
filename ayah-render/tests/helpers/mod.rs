//! Shared test helpers: fake engine, fake browser provider, WAV fixtures

#![allow(dead_code)]

pub mod log_capture;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use ayah_common::config::{BrowserSettings, ServiceConfig};
use ayah_common::InputProps;
use ayah_render::audio::AudioDurationResolver;
use ayah_render::browser::{
    BrowserError, BrowserLease, BrowserOptions, BrowserProvider, BrowserStrategy, StrategySelector,
};
use ayah_render::engine::{BundleRef, CompositionEngine, CompositionInfo, EngineError, RenderJob};
use ayah_render::{build_router, AppState, RenderOrchestrator};
use http_body_util::BodyExt;
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Bytes the fake engine writes as "video"
pub const FAKE_MP4: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isomfake-frames";

/// Engine stage the fake should fail at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Bundle,
    Compositions,
    Render,
    /// Render writes partial output, then never completes
    HangInRender,
}

/// In-memory composition engine recording every call
pub struct FakeEngine {
    pub composition_ids: Vec<String>,
    pub fail_at: Option<FailAt>,
    calls: Mutex<Vec<&'static str>>,
    discovery_browser: Mutex<Option<BrowserOptions>>,
    last_job: Mutex<Option<Value>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            composition_ids: vec![
                "ClassicTemplate".to_string(),
                "ModernTemplate".to_string(),
                "CapcutTemplate".to_string(),
            ],
            fail_at: None,
            calls: Mutex::new(Vec::new()),
            discovery_browser: Mutex::new(None),
            last_job: Mutex::new(None),
        }
    }

    pub fn exposing(ids: &[&str]) -> Self {
        Self {
            composition_ids: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn failing_at(stage: FailAt) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::new()
        }
    }

    /// Whether `call` has been made, for polling from another task
    pub fn has_called(&self, call: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| *c == call)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn discovery_browser(&self) -> Option<BrowserOptions> {
        self.discovery_browser.lock().unwrap().clone()
    }

    pub fn last_job(&self) -> Option<Value> {
        self.last_job.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(operation: &'static str, stderr: &str) -> EngineError {
        EngineError::Failed {
            operation,
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        }
    }
}

#[async_trait]
impl CompositionEngine for FakeEngine {
    async fn bundle(&self, _entry: &Path, _out_dir: &Path) -> Result<BundleRef, EngineError> {
        self.record("bundle");
        if self.fail_at == Some(FailAt::Bundle) {
            return Err(Self::failure("bundle", "Cannot find module './index.ts'"));
        }
        Ok(BundleRef {
            serve_url: "file:///srv/bundle".to_string(),
        })
    }

    async fn compositions(
        &self,
        _bundle: &BundleRef,
        browser: &BrowserOptions,
        _input_props: &InputProps,
    ) -> Result<Vec<CompositionInfo>, EngineError> {
        self.record("compositions");
        *self.discovery_browser.lock().unwrap() = Some(browser.clone());
        if self.fail_at == Some(FailAt::Compositions) {
            return Err(Self::failure("compositions", "Target closed"));
        }
        Ok(self
            .composition_ids
            .iter()
            .map(|id| CompositionInfo::new(id.clone()))
            .collect())
    }

    async fn render(&self, job: &RenderJob) -> Result<(), EngineError> {
        self.record("render");
        *self.last_job.lock().unwrap() = Some(serde_json::to_value(job).unwrap());
        if self.fail_at == Some(FailAt::HangInRender) {
            tokio::fs::write(&job.output_location, &FAKE_MP4[..8]).await?;
            return std::future::pending().await;
        }
        if self.fail_at == Some(FailAt::Render) {
            // Partial output left behind by a crashed render
            tokio::fs::write(&job.output_location, &FAKE_MP4[..8]).await?;
            return Err(Self::failure("render", "Browser disconnected mid-render"));
        }
        tokio::fs::write(&job.output_location, FAKE_MP4).await?;
        Ok(())
    }
}

/// Browser provider recording which strategies were requested
pub struct FakeBrowserProvider {
    pub fail: bool,
    strategies: Mutex<Vec<String>>,
    active: Arc<AtomicUsize>,
}

impl FakeBrowserProvider {
    pub fn new() -> Self {
        Self {
            fail: false,
            strategies: Mutex::new(Vec::new()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn strategies(&self) -> Vec<String> {
        self.strategies.lock().unwrap().clone()
    }

    pub fn active_connections_now(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserProvider for FakeBrowserProvider {
    async fn acquire(&self, strategy: &BrowserStrategy) -> Result<BrowserLease, BrowserError> {
        self.strategies.lock().unwrap().push(strategy.name().to_string());
        if self.fail {
            return Err(BrowserError::Unreachable {
                target: strategy.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(BrowserLease::tracked(
            strategy,
            BrowserOptions::for_strategy(strategy),
            self.active.clone(),
        ))
    }

    fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Router wired to fakes, with its own temp directory
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub engine: Arc<FakeEngine>,
    pub browsers: Arc<FakeBrowserProvider>,
    pub temp_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new(engine: FakeEngine) -> Self {
        Self::build(engine, FakeBrowserProvider::new(), BrowserSettings::default())
    }

    pub fn build(engine: FakeEngine, browsers: FakeBrowserProvider, browser: BrowserSettings) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.engine.temp_dir = temp_dir.path().to_path_buf();
        config.browser = browser;
        let config = Arc::new(config);

        let engine = Arc::new(engine);
        let browsers = Arc::new(browsers);
        // No PATH search: tests decide the local executable explicitly
        let selector = StrategySelector::with_search_path(&config.browser, None);
        let audio = AudioDurationResolver::new(Duration::from_secs(5), 16 * 1024 * 1024).unwrap();

        let orchestrator = RenderOrchestrator::new(
            &config,
            engine.clone(),
            browsers.clone(),
            selector,
            audio,
        );
        let state = AppState::new(config, Arc::new(orchestrator));

        Self {
            router: build_router(state.clone()),
            state,
            engine,
            browsers,
            temp_dir,
        }
    }

    /// Files left in the render temp directory
    pub fn leftover_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path()).unwrap().count()
    }

    pub async fn post_render(&self, body: Value) -> (StatusCode, HeaderMap, Bytes) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/render-video")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }
}

/// In-memory 16-bit mono WAV of the given length
pub fn wav_bytes(duration_seconds: f64, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
        let total_samples = (duration_seconds * sample_rate as f64) as usize;
        for i in 0..total_samples {
            let t = i as f64 / sample_rate as f64;
            let sample = (t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 0.5;
            writer.write_sample((sample * i16::MAX as f64) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buffer
}
