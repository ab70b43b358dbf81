//! Command-line arguments
//!
//! Every flag can also be supplied through its environment variable; both
//! take priority over the TOML config file.

use ayah_common::config::ConfigOverrides;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for ayah-render
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ayah-render")]
#[command(about = "Renders ayah videos through an external composition engine")]
#[command(version)]
pub struct Cli {
    /// TOML config file (default: <config dir>/ayah-render/config.toml if present)
    #[arg(short, long, env = "AYAH_RENDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "AYAH_RENDER_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Remote browser-automation endpoint
    #[arg(long, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Access token for the remote browser endpoint
    #[arg(long, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub browserless_token: Option<String>,

    /// Local browser executable (default: searched on PATH)
    #[arg(long, env = "BROWSER_EXECUTABLE")]
    pub browser_executable: Option<PathBuf>,

    /// Composition source entry point
    #[arg(long, env = "COMPOSITION_ENTRY")]
    pub composition_entry: Option<PathBuf>,

    /// Bundle output directory
    #[arg(long, env = "BUNDLE_OUT_DIR")]
    pub bundle_out_dir: Option<PathBuf>,

    /// Program running the render worker
    #[arg(long, env = "RENDER_WORKER_PROGRAM")]
    pub worker_program: Option<String>,

    /// Render worker script
    #[arg(long, env = "RENDER_WORKER_SCRIPT")]
    pub worker_script: Option<PathBuf>,

    /// Directory for temporary render output
    #[arg(long, env = "RENDER_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Process-wide cap on simultaneous renders
    #[arg(long, env = "MAX_CONCURRENT_RENDERS")]
    pub max_concurrent_renders: Option<usize>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            browserless_url: self.browserless_url.clone(),
            browserless_token: self.browserless_token.clone(),
            browser_executable: self.browser_executable.clone(),
            composition_entry: self.composition_entry.clone(),
            bundle_out_dir: self.bundle_out_dir.clone(),
            worker_program: self.worker_program.clone(),
            worker_script: self.worker_script.clone(),
            temp_dir: self.temp_dir.clone(),
            max_concurrent_renders: self.max_concurrent_renders,
        }
    }
}
