//! Browser strategy selection
//!
//! Decides how the composition engine obtains a controllable browser.
//! First match wins:
//! 1. Remote connect: endpoint URL and a real access token are configured
//! 2. Local launch: a browser executable is configured or found on `PATH`
//! 3. Engine default: no hints, the engine discovers its own browser
//!
//! The selector is built once at startup; `select` does no I/O.

mod preset;
mod provider;

pub use preset::LaunchPreset;
pub use provider::{BrowserError, BrowserLease, BrowserOptions, BrowserProvider, DevToolsBrowserProvider};

use ayah_common::config::BrowserSettings;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;

/// Executable names probed on `PATH` when none is configured
pub const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Remote browser-automation endpoint with its access token
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    base_url: String,
    token: String,
}

impl RemoteEndpoint {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Connection target: the endpoint URL with the token as a credential parameter
    pub fn ws_endpoint(&self) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.base_url, separator, self.token)
    }
}

// Display and Debug never expose the token
impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        write!(f, "{}{}token=***", self.base_url, separator)
    }
}

impl fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish()
    }
}

/// Local browser process launched with a static flag preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalLaunch {
    pub executable: PathBuf,
    pub preset: LaunchPreset,
}

/// How the engine obtains a browser for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserStrategy {
    Remote(RemoteEndpoint),
    Local(LocalLaunch),
    EngineDefault,
}

impl BrowserStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserStrategy::Remote(_) => "remote",
            BrowserStrategy::Local(_) => "local",
            BrowserStrategy::EngineDefault => "default",
        }
    }
}

impl fmt::Display for BrowserStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserStrategy::Remote(endpoint) => write!(f, "remote {}", endpoint),
            BrowserStrategy::Local(local) => write!(
                f,
                "local {} [{}]",
                local.executable.display(),
                local.preset.name()
            ),
            BrowserStrategy::EngineDefault => f.write_str("engine default"),
        }
    }
}

/// Chooses a `BrowserStrategy` from the startup configuration
#[derive(Debug, Clone)]
pub struct StrategySelector {
    remote: Option<RemoteEndpoint>,
    local_executable: Option<PathBuf>,
}

impl StrategySelector {
    /// Build from settings, searching the process `PATH` for a local browser
    pub fn new(settings: &BrowserSettings) -> Self {
        let search_path = std::env::var_os("PATH");
        Self::with_search_path(settings, search_path.as_deref())
    }

    /// Build from settings with an explicit executable search path
    pub fn with_search_path(settings: &BrowserSettings, search_path: Option<&OsStr>) -> Self {
        let remote = settings
            .remote_credentials()
            .map(|(url, token)| RemoteEndpoint::new(url, token));
        let local_executable = settings
            .executable
            .clone()
            .or_else(|| search_path.and_then(find_browser_executable));

        Self {
            remote,
            local_executable,
        }
    }

    pub fn select(&self) -> BrowserStrategy {
        if let Some(endpoint) = &self.remote {
            return BrowserStrategy::Remote(endpoint.clone());
        }
        if let Some(executable) = &self.local_executable {
            return BrowserStrategy::Local(LocalLaunch {
                executable: executable.clone(),
                preset: LaunchPreset::ContainerSafe,
            });
        }
        BrowserStrategy::EngineDefault
    }
}

fn find_browser_executable(search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .flat_map(|dir| BROWSER_CANDIDATES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}
