use serde::{Deserialize, Serialize};

/// Audio is always streamed as raw little-endian f32 PCM at 48kHz
pub const AUDIO_ENCODING: &str = "pcm_f32le";
pub const AUDIO_SAMPLE_RATE: u32 = 48000;

pub const OPERATING_POINT: &str = "enhanced";
pub const DIARIZATION_MODE: &str = "speaker";
pub const DIARIZATION_MAX_SPEAKERS: u32 = 10;

/// Messages sent to the recognizer, tagged by the `message` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message")]
pub enum ClientMessage {
    StartRecognition {
        audio_format: AudioFormat,
        transcription_config: TranscriptionConfig,
    },
    AddAudio {
        data: String, // Base64-encoded audio bytes
        seq_no: u64,
    },
    EndOfStream {
        last_seq_no: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub encoding: String,
    pub sample_rate: u32,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            format_type: "raw".to_string(),
            encoding: AUDIO_ENCODING.to_string(),
            sample_rate: AUDIO_SAMPLE_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub language: String,
    pub enable_partials: bool,
    pub operating_point: String,
    pub enable_entities: bool,
    pub speaker_diarization: String,
    pub diarization_max_speakers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<f64>,
}

/// Messages received from the recognizer, tagged by the `message` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "message")]
pub enum ServerMessage {
    RecognitionStarted {
        #[serde(default)]
        id: Option<String>,
    },
    AddTranscript {
        #[serde(default)]
        metadata: TranscriptMetadata,
    },
    AddPartialTranscript {
        #[serde(default)]
        metadata: TranscriptMetadata,
    },
    EndOfTranscript,
    AudioAdded {
        #[serde(default)]
        seq_no: Option<u64>,
    },
    Error(Notice),
    Warning(Notice),
    Info(Notice),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscriptMetadata {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
}

/// Body of Error, Warning and Info messages
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Notice {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}
