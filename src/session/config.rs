use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Locale used when the caller does not name one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Attribute keys understood by [`StreamingConfig::from_attributes`]
pub const ATTR_LANGUAGE: &str = "language";
pub const ATTR_ENABLE_PARTIALS: &str = "enable_partials";
pub const ATTR_MAX_DELAY: &str = "max_delay";

/// Transcription parameters for one streaming session.
///
/// Built once per session. Defaults are applied here and nowhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Recognition language code (e.g. "en")
    pub language: String,

    /// Whether upstream should emit partial (interim) transcripts
    pub enable_partials: bool,

    /// Maximum recognition latency in seconds; `None` leaves the upstream default
    pub max_delay: Option<f64>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            enable_partials: false,
            max_delay: None,
        }
    }
}

impl StreamingConfig {
    pub fn new(language: &str, enable_partials: bool, max_delay: f64) -> Self {
        Self {
            language: resolve_language(Some(language)),
            enable_partials,
            max_delay: resolve_max_delay(max_delay),
        }
    }

    /// Build a config from a loosely typed attribute map.
    ///
    /// Missing keys fall back to defaults. `max_delay <= 0` means "unset".
    /// A `max_delay` that is not a finite number is rejected.
    pub fn from_attributes(attributes: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let language = resolve_language(attributes.get(ATTR_LANGUAGE).map(String::as_str));

        let enable_partials = match attributes.get(ATTR_ENABLE_PARTIALS).map(|v| v.trim()) {
            None | Some("") => false,
            Some(value) => parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
                field: ATTR_ENABLE_PARTIALS.to_string(),
                value: value.to_string(),
            })?,
        };

        let max_delay = match attributes.get(ATTR_MAX_DELAY).map(|v| v.trim()) {
            None | Some("") => None,
            Some(value) => {
                let parsed = value
                    .parse::<f64>()
                    .ok()
                    .filter(|d| d.is_finite())
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: ATTR_MAX_DELAY.to_string(),
                        value: value.to_string(),
                    })?;
                resolve_max_delay(parsed)
            }
        };

        Ok(Self {
            language,
            enable_partials,
            max_delay,
        })
    }

    /// Parse a flat `key=value,key=value` payload into a config.
    ///
    /// Empty segments are tolerated and segments without `=` are ignored.
    pub fn from_payload(payload: &[u8]) -> Result<Self, ConfigError> {
        let text = std::str::from_utf8(payload).map_err(|_| ConfigError::NotUtf8)?;
        Self::from_attributes(&parse_pairs(text))
    }
}

/// Split a `key=value,key=value` string into a map; later keys win
pub fn parse_pairs(text: &str) -> HashMap<String, String> {
    text.split(',')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

fn resolve_language(language: Option<&str>) -> String {
    match language.map(str::trim) {
        Some(lang) if !lang.is_empty() => lang.to_string(),
        _ => DEFAULT_LANGUAGE.to_string(),
    }
}

fn resolve_max_delay(max_delay: f64) -> Option<f64> {
    (max_delay > 0.0).then_some(max_delay)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Per-bridge settings shared read-only by every session it runs
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Deadline for connecting to upstream
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Deadline for each upstream receive
    /// Default: 60 seconds
    pub read_timeout: Duration,

    /// Deadline for each upstream send
    /// Default: 10 seconds
    pub write_timeout: Duration,

    /// Deadline for the final EndOfStream and close after cancellation
    /// Default: 1 second
    pub drain_timeout: Duration,

    /// Capacity of the transcript event channel between bridge and gateway
    pub event_buffer: usize,

    /// Capacity of the audio channel between gateway and bridge
    pub audio_buffer: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(1),
            event_buffer: 100,
            audio_buffer: 100,
        }
    }
}
