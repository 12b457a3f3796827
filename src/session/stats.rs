use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a transcript may still be revised by upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    /// Upstream will not revise this text further
    Final,
    /// Provisional text, may be superseded by later partial or final events
    Partial,
}

/// A single transcript event relayed from upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub kind: TranscriptKind,
    pub text: String,
}

impl TranscriptEvent {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            kind: TranscriptKind::Final,
            text: text.into(),
        }
    }

    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            kind: TranscriptKind::Partial,
            text: text.into(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.kind == TranscriptKind::Final
    }
}

/// Lifecycle of a bridge session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Handshaking,
    Streaming,
    Draining,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Handshaking => "handshaking",
            SessionState::Streaming => "streaming",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Statistics about a completed bridge session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Identifier used in this session's log span
    pub session_id: String,

    /// When the session was opened
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of AddAudio frames sent upstream
    pub frames_sent: u64,

    /// Number of partial transcripts delivered to the caller
    pub partials_forwarded: usize,

    /// Number of final transcripts delivered to the caller
    pub finals_forwarded: usize,

    /// State the session ended in
    pub state: SessionState,
}

impl SessionStats {
    /// Stats for a session that never opened an upstream connection
    pub fn idle() -> Self {
        Self {
            session_id: String::new(),
            started_at: Utc::now(),
            duration_secs: 0.0,
            frames_sent: 0,
            partials_forwarded: 0,
            finals_forwarded: 0,
            state: SessionState::Idle,
        }
    }

    pub fn events_forwarded(&self) -> usize {
        self.partials_forwarded + self.finals_forwarded
    }
}
