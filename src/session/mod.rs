//! Streaming transcription sessions
//!
//! This module provides the `StreamingBridge` that manages one upstream
//! session per call:
//! - Credential lookup and the StartRecognition handshake
//! - A write pump sending audio frames upstream in order
//! - A read pump relaying transcript events back to the caller
//! - Cancellation, deadlines and a single terminal outcome

mod bridge;
mod config;
mod stats;

pub use bridge::StreamingBridge;
pub use config::{parse_pairs, BridgeSettings, StreamingConfig, DEFAULT_LANGUAGE};
pub use stats::{SessionState, SessionStats, TranscriptEvent, TranscriptKind};
