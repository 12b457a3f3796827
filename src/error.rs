//! Error types for the transcription bridge

use thiserror::Error;

/// Terminal outcome of a bridge session that did not end cleanly.
///
/// A session reports at most one of these. Failures on individual upstream
/// messages are logged and skipped and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("session cancelled")]
    Cancelled,

    #[error("downstream error: {0}")]
    Downstream(String),
}

impl BridgeError {
    /// Cancellation is an outcome requested by the caller, not a bridge failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BridgeError::Cancelled)
    }
}

/// Malformed or missing streaming configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("configuration payload is not valid UTF-8")]
    NotUtf8,
}
