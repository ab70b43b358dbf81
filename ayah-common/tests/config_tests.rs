//! Configuration resolution tests
//!
//! Covers priority order (overrides → TOML → defaults), TOML parsing and
//! validation of unusable values.

use ayah_common::config::{
    load_toml_config, ConfigOverrides, ServiceConfig, TomlConfig, DEFAULT_BODY_LIMIT_BYTES,
    DEFAULT_PORT,
};
use ayah_common::Error;
use std::io::Write;
use std::path::PathBuf;

const SAMPLE_TOML: &str = r#"
host = "127.0.0.1"
port = 8088

[browser]
browserless_url = "wss://chrome.browserless.io"
browserless_token = "from-toml"

[engine]
composition_entry = "compositions/index.ts"
worker_script = "scripts/worker.mjs"
verbose = false

[limits]
body_limit_bytes = 1048576
max_concurrent_renders = 2
audio_max_bytes = 4096
"#;

#[test]
fn test_defaults_without_any_source() {
    let config = ServiceConfig::resolve(ConfigOverrides::default(), None).unwrap();

    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.limits.body_limit_bytes, DEFAULT_BODY_LIMIT_BYTES);
    assert_eq!(config.limits.max_concurrent_renders, None);
    assert_eq!(config.engine.worker_program, "node");
    assert_eq!(
        config.engine.composition_entry,
        PathBuf::from("remotion").join("index.ts")
    );
    assert!(config.engine.verbose);
    assert!(config.browser.remote_credentials().is_none());
}

#[test]
fn test_toml_layer_applies() {
    let toml = TomlConfig::parse(SAMPLE_TOML).unwrap();
    let config = ServiceConfig::resolve(ConfigOverrides::default(), Some(toml)).unwrap();

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8088);
    assert_eq!(
        config.browser.remote_credentials(),
        Some(("wss://chrome.browserless.io", "from-toml"))
    );
    assert_eq!(config.engine.worker_script, PathBuf::from("scripts/worker.mjs"));
    assert!(!config.engine.verbose);
    assert_eq!(config.limits.body_limit_bytes, 1_048_576);
    assert_eq!(config.limits.max_concurrent_renders, Some(2));
    assert_eq!(config.limits.audio_max_bytes, 4096);
}

#[test]
fn test_overrides_beat_toml() {
    let toml = TomlConfig::parse(SAMPLE_TOML).unwrap();
    let overrides = ConfigOverrides {
        port: Some(9000),
        browserless_token: Some("from-env".to_string()),
        max_concurrent_renders: Some(1),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(overrides, Some(toml)).unwrap();

    assert_eq!(config.port, 9000);
    // Untouched fields still come from TOML
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(
        config.browser.remote_credentials(),
        Some(("wss://chrome.browserless.io", "from-env"))
    );
    assert_eq!(config.limits.max_concurrent_renders, Some(1));
}

#[test]
fn test_empty_override_values_count_as_unset() {
    let overrides = ConfigOverrides {
        browserless_url: Some(String::new()),
        browserless_token: Some("   ".to_string()),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(overrides, None).unwrap();

    assert_eq!(config.browser.browserless_url, None);
    assert_eq!(config.browser.browserless_token, None);
}

#[test]
fn test_zero_render_limit_rejected() {
    let overrides = ConfigOverrides {
        max_concurrent_renders: Some(0),
        ..Default::default()
    };
    let err = ServiceConfig::resolve(overrides, None).unwrap_err();
    assert!(matches!(err, Error::Config(msg) if msg.contains("max_concurrent_renders")));
}

#[test]
fn test_unknown_toml_field_rejected() {
    let result = TomlConfig::parse("[browser]\nbrowserless_tokn = \"typo\"\n");
    assert!(result.is_err());
}

#[test]
fn test_load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

    let toml = load_toml_config(Some(file.path())).unwrap().unwrap();
    assert_eq!(toml.port, Some(8088));
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = load_toml_config(Some(&missing)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
