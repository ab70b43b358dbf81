//! Render worker process
//!
//! Each engine operation runs `{program} {script} <operation>`: one JSON
//! request on stdin, one JSON reply as the last non-empty stdout line.
//! Anything else the worker prints (progress, verbose logs) goes to stderr.
//!
//! Children are spawned with `kill_on_drop`, so dropping an operation's
//! future (caller disconnected) terminates the worker.

use super::{BundleRef, CompositionEngine, CompositionInfo, EngineError, RenderJob};
use crate::browser::BrowserOptions;
use async_trait::async_trait;
use ayah_common::config::EngineSettings;
use ayah_common::InputProps;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Lines of worker stderr kept in error messages
const STDERR_TAIL_LINES: usize = 20;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleRequest<'a> {
    entry_point: &'a Path,
    out_dir: &'a Path,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompositionsRequest<'a> {
    serve_url: &'a str,
    chromium_options: &'a BrowserOptions,
    input_props: &'a InputProps,
}

#[derive(Deserialize)]
struct CompositionsReply {
    compositions: Vec<CompositionInfo>,
}

#[derive(Deserialize)]
struct RenderReply {}

/// Engine backed by an external render worker script
#[derive(Debug, Clone)]
pub struct WorkerEngine {
    program: String,
    script: PathBuf,
}

impl WorkerEngine {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.worker_program.clone(), settings.worker_script.clone())
    }

    async fn invoke<Req, Reply>(&self, operation: &'static str, request: &Req) -> Result<Reply, EngineError>
    where
        Req: Serialize + Sync,
        Reply: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request).map_err(|e| EngineError::Protocol {
            operation,
            message: e.to_string(),
        })?;

        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .arg(&self.script)
            .arg(operation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| EngineError::Protocol {
            operation,
            message: "worker stdin unavailable".to_string(),
        })?;

        // Feed stdin while draining stdout/stderr so neither side blocks on a full pipe
        let write = async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(EngineError::Failed {
                operation,
                status: output.status.to_string(),
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            });
        }
        written?;

        debug!(operation, worker_log = %tail(&stderr, STDERR_TAIL_LINES), "Worker stderr");
        info!(
            operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Worker operation completed"
        );

        parse_reply(operation, &output.stdout)
    }
}

#[async_trait]
impl CompositionEngine for WorkerEngine {
    async fn bundle(&self, entry: &Path, out_dir: &Path) -> Result<BundleRef, EngineError> {
        let request = BundleRequest {
            entry_point: entry,
            out_dir,
        };
        self.invoke("bundle", &request).await
    }

    async fn compositions(
        &self,
        bundle: &BundleRef,
        browser: &BrowserOptions,
        input_props: &InputProps,
    ) -> Result<Vec<CompositionInfo>, EngineError> {
        let request = CompositionsRequest {
            serve_url: &bundle.serve_url,
            chromium_options: browser,
            input_props,
        };
        let reply: CompositionsReply = self.invoke("compositions", &request).await?;
        Ok(reply.compositions)
    }

    async fn render(&self, job: &RenderJob) -> Result<(), EngineError> {
        let _: RenderReply = self.invoke("render", job).await?;
        Ok(())
    }
}

fn parse_reply<Reply: DeserializeOwned>(operation: &'static str, stdout: &[u8]) -> Result<Reply, EngineError> {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| EngineError::Protocol {
            operation,
            message: "empty reply".to_string(),
        })?;

    serde_json::from_str(line).map_err(|e| EngineError::Protocol {
        operation,
        message: e.to_string(),
    })
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
