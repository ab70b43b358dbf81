//! Render request data model
//!
//! Everything here is request-scoped: a `RenderRequest` is received once per
//! call and is never mutated. Ayah payloads and the unrecognised parts of the
//! render config are opaque and forwarded to the composition engine untouched.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A unit of verse content, forwarded opaquely to the composition engine
pub type Ayah = Value;

/// Resolved audio durations in seconds, index-aligned with `RenderConfig::audio_urls`.
///
/// `None` marks a duration that could not be resolved.
pub type AudioDurations = Vec<Option<f64>>;

/// POST /render-video request body
///
/// `config` is `None` when absent or null. A `config` that is not an object
/// reads as an empty config, so it fails template lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ayahs: Vec<Ayah>,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub config: Option<RenderConfig>,
}

/// Rendering configuration
///
/// Only `template` and `audioUrl` are interpreted by the service. Both are
/// kept as raw JSON so that a wrongly typed value is judged by the pipeline
/// rather than rejected by the parser. Every other field is kept in `extra`
/// and round-trips to the composition engine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Value>,

    #[serde(rename = "audioUrl", default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RenderConfig {
    /// Resolve the requested template, `None` when absent, not a string or unknown
    pub fn template(&self) -> Option<Template> {
        self.template.as_ref()?.as_str()?.parse().ok()
    }

    /// The template value as sent, for diagnostics
    pub fn requested_template(&self) -> Option<String> {
        self.template.as_ref().map(|value| match value {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        })
    }

    /// Audio URL entries, absent or null meaning none
    ///
    /// Entries are returned as sent; non-string entries resolve to no duration.
    pub fn audio_urls(&self) -> crate::Result<&[Value]> {
        match &self.audio_url {
            None | Some(Value::Null) => Ok(&[][..]),
            Some(Value::Array(entries)) => Ok(entries),
            Some(other) => Err(Error::InvalidInput(format!(
                "audioUrl must be a list, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn object_or_empty<'de, D>(deserializer: D) -> std::result::Result<Option<RenderConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(Some)
            .map_err(de::Error::custom),
        Some(_) => Ok(Some(RenderConfig::default())),
    }
}

/// Predefined compositions the engine must expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Classic,
    Modern,
    Capcut,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Classic, Template::Modern, Template::Capcut];

    /// Request-facing template name
    pub fn as_str(self) -> &'static str {
        match self {
            Template::Classic => "classic",
            Template::Modern => "modern",
            Template::Capcut => "capcut",
        }
    }

    /// Composition identifier exposed by the bundle for this template
    pub fn composition_id(self) -> &'static str {
        match self {
            Template::Classic => "ClassicTemplate",
            Template::Modern => "ModernTemplate",
            Template::Capcut => "CapcutTemplate",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown template: {}", s)))
    }
}

/// Input properties handed to composition discovery and rendering
#[derive(Debug, Clone, Serialize)]
pub struct InputProps {
    pub ayahs: Vec<Ayah>,
    pub config: RenderConfig,
    #[serde(rename = "audioDurations", skip_serializing_if = "Option::is_none")]
    pub audio_durations: Option<AudioDurations>,
}

impl InputProps {
    /// Props for composition discovery (no audio durations yet)
    pub fn new(ayahs: Vec<Ayah>, config: RenderConfig) -> Self {
        Self {
            ayahs,
            config,
            audio_durations: None,
        }
    }

    /// Extend the props with resolved audio durations for rendering
    pub fn with_audio_durations(mut self, durations: AudioDurations) -> Self {
        self.audio_durations = Some(durations);
        self
    }
}
