//! Named browser launch presets
//!
//! Flag lists are a compatibility contract with the deployment environment.

use serde::Serialize;

/// Flags for a sandboxless, GPU-less container with tight memory
const CONTAINER_SAFE_FLAGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-first-run",
    "--no-zygote",
    "--single-process",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-web-security",
    "--disable-features=TranslateUI,VizDisplayCompositor",
    "--disable-extensions",
    "--disable-default-apps",
    "--use-gl=swiftshader",
    "--disable-software-rasterizer",
    "--disable-background-networking",
    "--disable-background-mode",
    "--disable-client-side-phishing-detection",
    "--disable-component-update",
    "--disable-domain-reliability",
    "--disable-hang-monitor",
    "--disable-prompt-on-repost",
    "--disable-sync",
    "--metrics-recording-only",
    "--safebrowsing-disable-auto-update",
    "--memory-pressure-off",
    "--max_old_space_size=4096",
    "--disable-ipc-flooding-protection",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchPreset {
    ContainerSafe,
}

impl LaunchPreset {
    pub fn name(self) -> &'static str {
        match self {
            LaunchPreset::ContainerSafe => "container-safe",
        }
    }

    pub fn flags(self) -> &'static [&'static str] {
        match self {
            LaunchPreset::ContainerSafe => CONTAINER_SAFE_FLAGS,
        }
    }
}
