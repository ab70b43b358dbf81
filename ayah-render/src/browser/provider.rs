//! Browser acquisition
//!
//! Turns a `BrowserStrategy` into a `BrowserLease`: the connection options
//! handed to the composition engine, held for the duration of one request.
//! Remote endpoints are verified through the DevTools `/json/version`
//! handshake before the engine is pointed at them.

use super::{BrowserStrategy, RemoteEndpoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Browser connection errors
///
/// `target` is always the redacted endpoint, never the raw token.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to connect to remote browser at {target}: {message}")]
    Unreachable { target: String, message: String },

    #[error("Remote browser at {target} rejected the access token (HTTP {status})")]
    Rejected { target: String, status: u16 },

    #[error("Invalid remote browser endpoint {target}: {message}")]
    InvalidEndpoint { target: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Browser connection hints passed through to the engine
#[derive(Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl BrowserOptions {
    pub fn for_strategy(strategy: &BrowserStrategy) -> Self {
        match strategy {
            BrowserStrategy::Remote(endpoint) => Self {
                ws_endpoint: Some(endpoint.ws_endpoint()),
                ..Default::default()
            },
            BrowserStrategy::Local(local) => Self {
                ws_endpoint: None,
                executable_path: Some(local.executable.clone()),
                args: local.preset.flags().iter().map(|f| f.to_string()).collect(),
            },
            BrowserStrategy::EngineDefault => Self::default(),
        }
    }
}

impl fmt::Debug for BrowserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserOptions")
            .field("ws_endpoint", &self.ws_endpoint.as_ref().map(|_| "<redacted>"))
            .field("executable_path", &self.executable_path)
            .field("args", &self.args.len())
            .finish()
    }
}

/// A browser connection held by one request
///
/// `release` consumes the lease, so it can only happen once. A lease dropped
/// without release (request future cancelled) is still accounted for.
#[derive(Debug)]
pub struct BrowserLease {
    strategy: &'static str,
    target: String,
    options: BrowserOptions,
    active: Arc<AtomicUsize>,
    released: bool,
}

impl BrowserLease {
    /// Lease counted in `active` until released or dropped
    pub fn tracked(strategy: &BrowserStrategy, options: BrowserOptions, active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            strategy: strategy.name(),
            target: strategy.to_string(),
            options,
            active,
            released: false,
        }
    }

    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    pub fn release(mut self) {
        self.released = true;
        info!(strategy = self.strategy, connection = %self.target, "Browser connection released");
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if !self.released {
            warn!(
                strategy = self.strategy,
                connection = %self.target,
                "Browser connection dropped without release"
            );
        }
    }
}

/// Source of browser connections for the render pipeline
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn acquire(&self, strategy: &BrowserStrategy) -> Result<BrowserLease, BrowserError>;

    /// Leases currently held
    fn active_connections(&self) -> usize;
}

#[derive(Debug, Deserialize)]
struct DevToolsVersion {
    #[serde(rename = "Browser", default)]
    browser: Option<String>,
}

/// Production provider: DevTools handshake for remote endpoints, no I/O otherwise
pub struct DevToolsBrowserProvider {
    http_client: reqwest::Client,
    active: Arc<AtomicUsize>,
}

impl DevToolsBrowserProvider {
    pub fn new(timeout: Duration) -> Result<Self, BrowserError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrowserError::Client(e.to_string()))?;
        Ok(Self::with_client(http_client))
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn probe(&self, endpoint: &RemoteEndpoint) -> Result<Option<String>, BrowserError> {
        let target = endpoint.to_string();
        let url = devtools_version_url(endpoint)?;

        // without_url(): reqwest errors would otherwise echo the token
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| BrowserError::Unreachable {
                target: target.clone(),
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(BrowserError::Rejected {
                target,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(BrowserError::Unreachable {
                target,
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        Ok(response
            .json::<DevToolsVersion>()
            .await
            .ok()
            .and_then(|version| version.browser))
    }
}

#[async_trait]
impl BrowserProvider for DevToolsBrowserProvider {
    async fn acquire(&self, strategy: &BrowserStrategy) -> Result<BrowserLease, BrowserError> {
        if let BrowserStrategy::Remote(endpoint) = strategy {
            let browser = self.probe(endpoint).await?;
            info!(
                endpoint = %endpoint,
                browser = browser.as_deref().unwrap_or("unknown"),
                "Connected to remote browser"
            );
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

/// `ws(s)://host/...` → `http(s)://host/json/version?token=...`
fn devtools_version_url(endpoint: &RemoteEndpoint) -> Result<reqwest::Url, BrowserError> {
    let invalid = |message: String| BrowserError::InvalidEndpoint {
        target: endpoint.to_string(),
        message,
    };

    let mut url = reqwest::Url::parse(endpoint.base_url()).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot switch to {}", scheme)))?;
    url.set_path("/json/version");
    url.query_pairs_mut().append_pair("token", endpoint.token());
    Ok(url)
}
