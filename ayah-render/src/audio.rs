//! Audio duration resolution
//!
//! Fetches every referenced audio asset and extracts its playback duration
//! with lofty. Lookups run concurrently; results come back index-aligned with
//! the input URLs. A failure for one URL degrades to `None` for that entry
//! only and is never surfaced as a request error.

use ayah_common::AudioDurations;
use futures::future::join_all;
use lofty::prelude::*;
use lofty::probe::Probe;
use serde_json::Value;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("ayah-render/", env!("CARGO_PKG_VERSION"));

/// Audio resolution errors (logged, never returned to callers of `resolve_all`)
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Audio asset exceeds {0} bytes")]
    TooLarge(u64),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Resolves durations for the audio assets referenced by a render config
#[derive(Clone)]
pub struct AudioDurationResolver {
    http_client: reqwest::Client,
    max_bytes: u64,
}

impl AudioDurationResolver {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, AudioError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AudioError::Network(e.to_string()))?;

        Ok(Self::with_client(http_client, max_bytes))
    }

    pub fn with_client(http_client: reqwest::Client, max_bytes: u64) -> Self {
        Self {
            http_client,
            max_bytes,
        }
    }

    /// Resolve every URL concurrently, preserving input order
    ///
    /// Entries that are not strings resolve to `None`.
    pub async fn resolve_all(&self, urls: &[Value]) -> AudioDurations {
        if urls.is_empty() {
            return Vec::new();
        }

        let lookups = urls.iter().enumerate().map(|(index, entry)| async move {
            let Some(url) = entry.as_str() else {
                warn!(index, entry = %entry, "Audio URL is not a string");
                return None;
            };
            match self.resolve_one(url).await {
                Ok(duration) => duration,
                Err(e) => {
                    warn!(index, url = %url, error = %e, "Failed to get audio duration");
                    None
                }
            }
        });

        let durations = join_all(lookups).await;
        debug!(
            requested = urls.len(),
            resolved = durations.iter().filter(|d| d.is_some()).count(),
            "Audio durations resolved"
        );
        durations
    }

    async fn resolve_one(&self, url: &str) -> Result<Option<f64>, AudioError> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AudioError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "Audio fetch not successful");
            return Ok(None);
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AudioError::Network(e.to_string()))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(AudioError::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        tokio::task::spawn_blocking(move || probe_duration(body))
            .await
            .map_err(|e| AudioError::Parse(e.to_string()))?
    }
}

/// Extract the container-level duration from an in-memory audio asset
///
/// Zero or non-finite durations count as unknown.
pub fn probe_duration(bytes: Vec<u8>) -> Result<Option<f64>, AudioError> {
    let tagged_file = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .map_err(|e| AudioError::Parse(e.to_string()))?
        .read()
        .map_err(|e| AudioError::Parse(e.to_string()))?;

    let seconds = tagged_file.properties().duration().as_secs_f64();
    Ok((seconds.is_finite() && seconds > 0.0).then_some(seconds))
}
