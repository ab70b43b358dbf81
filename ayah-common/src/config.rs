//! Configuration loading and resolution
//!
//! The service builds one `ServiceConfig` at startup and shares it read-only.
//! Resolution priority for every field:
//! 1. Command-line argument / environment variable (`ConfigOverrides`)
//! 2. TOML config file
//! 3. Compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default request body limit (50 MiB)
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Default cap on a single downloaded audio asset (64 MiB)
pub const DEFAULT_AUDIO_MAX_BYTES: u64 = 64 * 1024 * 1024;

/// Default per-request audio fetch timeout
pub const DEFAULT_AUDIO_FETCH_TIMEOUT_SECS: u64 = 30;

/// Access-token values shipped in sample configs; never sent to a remote endpoint
const PLACEHOLDER_TOKENS: &[&str] = &[
    "your-token-here",
    "your_token_here",
    "your_browserless_token",
    "your-browserless-token",
    "changeme",
    "<token>",
    "token",
    "xxx",
];

/// Whether a configured access token is missing in all but name
pub fn is_placeholder_token(token: &str) -> bool {
    let token = token.trim();
    token.is_empty()
        || PLACEHOLDER_TOKENS
            .iter()
            .any(|placeholder| placeholder.eq_ignore_ascii_case(token))
}

/// Browser connectivity settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowserSettings {
    /// Remote browser-automation endpoint (e.g. `wss://chrome.browserless.io`)
    pub browserless_url: Option<String>,
    /// Access token for the remote endpoint
    pub browserless_token: Option<String>,
    /// Explicit local browser executable
    pub executable: Option<PathBuf>,
}

impl BrowserSettings {
    /// Remote endpoint and token, only when both are present and the token is real
    pub fn remote_credentials(&self) -> Option<(&str, &str)> {
        let url = self.browserless_url.as_deref().map(str::trim)?;
        let token = self.browserless_token.as_deref().map(str::trim)?;
        if url.is_empty() || is_placeholder_token(token) {
            return None;
        }
        Some((url, token))
    }
}

/// Composition engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Composition source entry point handed to the bundler
    pub composition_entry: PathBuf,
    /// Output directory for bundles
    pub bundle_out_dir: PathBuf,
    /// Program used to run the render worker
    pub worker_program: String,
    /// Render worker script
    pub worker_script: PathBuf,
    /// Directory for temporary render artifacts
    pub temp_dir: PathBuf,
    /// Ask the engine for verbose logs
    pub verbose: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            composition_entry: PathBuf::from("remotion").join("index.ts"),
            bundle_out_dir: PathBuf::from("dist"),
            worker_program: "node".to_string(),
            worker_script: PathBuf::from("render-worker.mjs"),
            temp_dir: std::env::temp_dir(),
            verbose: true,
        }
    }
}

/// Request and resource limits
#[derive(Debug, Clone, PartialEq)]
pub struct LimitSettings {
    pub body_limit_bytes: usize,
    /// Process-wide cap on simultaneous renders, `None` for unlimited
    pub max_concurrent_renders: Option<usize>,
    pub audio_fetch_timeout_secs: u64,
    pub audio_max_bytes: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            max_concurrent_renders: None,
            audio_fetch_timeout_secs: DEFAULT_AUDIO_FETCH_TIMEOUT_SECS,
            audio_max_bytes: DEFAULT_AUDIO_MAX_BYTES,
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub browser: BrowserSettings,
    pub engine: EngineSettings,
    pub limits: LimitSettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            browser: BrowserSettings::default(),
            engine: EngineSettings::default(),
            limits: LimitSettings::default(),
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub browser_executable: Option<PathBuf>,
    pub composition_entry: Option<PathBuf>,
    pub bundle_out_dir: Option<PathBuf>,
    pub worker_program: Option<String>,
    pub worker_script: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub max_concurrent_renders: Option<usize>,
}

/// TOML config file contents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub browser: TomlBrowser,
    #[serde(default)]
    pub engine: TomlEngine,
    #[serde(default)]
    pub limits: TomlLimits,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlBrowser {
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub executable: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlEngine {
    pub composition_entry: Option<PathBuf>,
    pub bundle_out_dir: Option<PathBuf>,
    pub worker_program: Option<String>,
    pub worker_script: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlLimits {
    pub body_limit_bytes: Option<usize>,
    pub max_concurrent_renders: Option<usize>,
    pub audio_fetch_timeout_secs: Option<u64>,
    pub audio_max_bytes: Option<u64>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Default config file location: `<config dir>/ayah-render/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ayah-render").join("config.toml"))
}

/// Load the TOML layer
///
/// An explicitly requested file must exist and parse. The default location is
/// optional: a missing file is not an error, the service starts on defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<Option<TomlConfig>> {
    if let Some(path) = explicit {
        info!("Loading config file {}", path.display());
        return TomlConfig::load(path).map(Some);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading config file {}", path.display());
            TomlConfig::load(&path).map(Some)
        }
        Some(path) => {
            debug!("No config file at {}, using defaults", path.display());
            Ok(None)
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            Ok(None)
        }
    }
}

impl ServiceConfig {
    /// Merge overrides, TOML and compiled defaults into a validated config
    pub fn resolve(overrides: ConfigOverrides, toml: Option<TomlConfig>) -> Result<Self> {
        let toml = toml.unwrap_or_default();
        let defaults = ServiceConfig::default();

        let config = ServiceConfig {
            host: overrides.host.or(toml.host).unwrap_or(defaults.host),
            port: overrides.port.or(toml.port).unwrap_or(defaults.port),
            browser: BrowserSettings {
                browserless_url: non_empty(
                    overrides.browserless_url.or(toml.browser.browserless_url),
                ),
                browserless_token: non_empty(
                    overrides.browserless_token.or(toml.browser.browserless_token),
                ),
                executable: overrides.browser_executable.or(toml.browser.executable),
            },
            engine: EngineSettings {
                composition_entry: overrides
                    .composition_entry
                    .or(toml.engine.composition_entry)
                    .unwrap_or(defaults.engine.composition_entry),
                bundle_out_dir: overrides
                    .bundle_out_dir
                    .or(toml.engine.bundle_out_dir)
                    .unwrap_or(defaults.engine.bundle_out_dir),
                worker_program: overrides
                    .worker_program
                    .or(toml.engine.worker_program)
                    .unwrap_or(defaults.engine.worker_program),
                worker_script: overrides
                    .worker_script
                    .or(toml.engine.worker_script)
                    .unwrap_or(defaults.engine.worker_script),
                temp_dir: overrides
                    .temp_dir
                    .or(toml.engine.temp_dir)
                    .unwrap_or(defaults.engine.temp_dir),
                verbose: toml.engine.verbose.unwrap_or(defaults.engine.verbose),
            },
            limits: LimitSettings {
                body_limit_bytes: toml
                    .limits
                    .body_limit_bytes
                    .unwrap_or(defaults.limits.body_limit_bytes),
                max_concurrent_renders: overrides
                    .max_concurrent_renders
                    .or(toml.limits.max_concurrent_renders),
                audio_fetch_timeout_secs: toml
                    .limits
                    .audio_fetch_timeout_secs
                    .unwrap_or(defaults.limits.audio_fetch_timeout_secs),
                audio_max_bytes: toml
                    .limits
                    .audio_max_bytes
                    .unwrap_or(defaults.limits.audio_max_bytes),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.limits.body_limit_bytes == 0 {
            return Err(Error::Config("body_limit_bytes must be positive".to_string()));
        }
        if self.limits.max_concurrent_renders == Some(0) {
            return Err(Error::Config(
                "max_concurrent_renders must be at least 1 (omit it for unlimited)".to_string(),
            ));
        }
        if self.limits.audio_fetch_timeout_secs == 0 {
            return Err(Error::Config("audio_fetch_timeout_secs must be positive".to_string()));
        }
        if self.engine.worker_program.trim().is_empty() {
            return Err(Error::Config("worker_program must not be empty".to_string()));
        }
        Ok(())
    }

    /// `host:port` listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_tokens() {
        assert!(is_placeholder_token(""));
        assert!(is_placeholder_token("   "));
        assert!(is_placeholder_token("your-token-here"));
        assert!(is_placeholder_token("YOUR_BROWSERLESS_TOKEN"));
        assert!(is_placeholder_token("ChangeMe"));
        assert!(!is_placeholder_token("9f8a7c2e-real-token"));
    }

    #[test]
    fn test_remote_credentials_require_both_values() {
        let mut settings = BrowserSettings {
            browserless_url: Some("wss://chrome.browserless.io".to_string()),
            browserless_token: None,
            executable: None,
        };
        assert!(settings.remote_credentials().is_none());

        settings.browserless_token = Some("your-token-here".to_string());
        assert!(settings.remote_credentials().is_none());

        settings.browserless_token = Some("abc123".to_string());
        assert_eq!(
            settings.remote_credentials(),
            Some(("wss://chrome.browserless.io", "abc123"))
        );

        settings.browserless_url = Some("  ".to_string());
        assert!(settings.remote_credentials().is_none());
    }

    #[test]
    fn test_listen_addr() {
        let config = ServiceConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
    }
}
