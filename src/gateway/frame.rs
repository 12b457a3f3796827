use crate::session::{TranscriptEvent, TranscriptKind};
use serde::{Deserialize, Serialize};

/// Type indicator marking the first inbound frame as configuration
pub const CONFIG_TYPE: &str = "config";

/// Type indicator of outbound final transcript frames
pub const TRANSCRIPTION_TYPE: &str = "transcription";

/// Type indicator of outbound partial transcript frames
pub const PARTIAL_TRANSCRIPTION_TYPE: &str = "transcription.partial";

/// A frame on a tagged stream: an opaque payload plus a type indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedFrame {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl TaggedFrame {
    pub fn new(type_url: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            type_url: type_url.into(),
            value: value.into(),
        }
    }

    /// A configuration frame carrying a `key=value,key=value` payload
    pub fn config(payload: &str) -> Self {
        Self::new(CONFIG_TYPE, payload.as_bytes())
    }

    /// An untagged audio frame
    pub fn audio(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new("", bytes)
    }

    pub fn is_config(&self) -> bool {
        self.type_url == CONFIG_TYPE
    }

    /// The transcript kind this frame carries, if it is a transcript frame
    pub fn transcript_kind(&self) -> Option<TranscriptKind> {
        match self.type_url.as_str() {
            TRANSCRIPTION_TYPE => Some(TranscriptKind::Final),
            PARTIAL_TRANSCRIPTION_TYPE => Some(TranscriptKind::Partial),
            _ => None,
        }
    }
}

impl From<TranscriptEvent> for TaggedFrame {
    fn from(event: TranscriptEvent) -> Self {
        let type_url = match event.kind {
            TranscriptKind::Final => TRANSCRIPTION_TYPE,
            TranscriptKind::Partial => PARTIAL_TRANSCRIPTION_TYPE,
        };
        Self::new(type_url, event.text.into_bytes())
    }
}
