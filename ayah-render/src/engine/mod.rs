//! Composition engine contract
//!
//! The bundler and the discovery/render engine are external collaborators.
//! The orchestrator only sees this trait; `WorkerEngine` is the production
//! implementation driving a render worker process.

mod worker;

pub use worker::WorkerEngine;

use crate::browser::BrowserOptions;
use async_trait::async_trait;
use ayah_common::InputProps;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{operation} exited with {status}: {stderr}")]
    Failed {
        operation: &'static str,
        status: String,
        stderr: String,
    },

    #[error("Malformed {operation} reply: {message}")]
    Protocol {
        operation: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Servable bundle produced by the bundler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRef {
    pub serve_url: String,
}

/// A composition exposed by a bundle
///
/// Only `id` is interpreted; the remaining metadata (dimensions, fps,
/// duration) is handed back to the engine for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionInfo {
    pub id: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CompositionInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            details: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    H264,
}

/// Everything the engine needs for one render
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub serve_url: String,
    pub composition: CompositionInfo,
    pub codec: Codec,
    pub output_location: PathBuf,
    pub input_props: InputProps,
    pub overwrite: bool,
    pub concurrency: u32,
    pub verbose: bool,
    pub chromium_options: BrowserOptions,
}

impl RenderJob {
    /// H.264/MP4 job with one in-flight frame pipeline, overwriting `output_location`
    pub fn h264(
        bundle: &BundleRef,
        composition: CompositionInfo,
        output_location: PathBuf,
        input_props: InputProps,
        chromium_options: BrowserOptions,
        verbose: bool,
    ) -> Self {
        Self {
            serve_url: bundle.serve_url.clone(),
            composition,
            codec: Codec::H264,
            output_location,
            input_props,
            overwrite: true,
            concurrency: 1,
            verbose,
            chromium_options,
        }
    }
}

#[async_trait]
pub trait CompositionEngine: Send + Sync {
    /// Package the composition source into a servable bundle
    async fn bundle(&self, entry: &Path, out_dir: &Path) -> Result<BundleRef, EngineError>;

    /// Enumerate compositions available in `bundle` for the given input
    async fn compositions(
        &self,
        bundle: &BundleRef,
        browser: &BrowserOptions,
        input_props: &InputProps,
    ) -> Result<Vec<CompositionInfo>, EngineError>;

    /// Render `job.composition` to `job.output_location`
    async fn render(&self, job: &RenderJob) -> Result<(), EngineError>;
}
