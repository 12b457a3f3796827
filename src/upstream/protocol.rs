//! Translation between bridge types and the recognizer's JSON protocol

use super::messages::{
    AudioFormat, ClientMessage, Notice, ServerMessage, TranscriptionConfig,
    DIARIZATION_MAX_SPEAKERS, DIARIZATION_MODE, OPERATING_POINT,
};
use crate::session::{StreamingConfig, TranscriptEvent};
use base64::Engine;
use tracing::{debug, info, trace, warn};

/// What the read pump should do with one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Forward this event to the caller
    Transcript(TranscriptEvent),
    /// Upstream finished; stop reading without error
    EndOfTranscript,
    /// Upstream reported a fatal error; carries the raw message
    Fatal(String),
    /// Nothing to forward
    Skip,
}

/// Build the StartRecognition handshake for a session
pub fn start_recognition(config: &StreamingConfig) -> ClientMessage {
    ClientMessage::StartRecognition {
        audio_format: AudioFormat::default(),
        transcription_config: TranscriptionConfig {
            language: config.language.clone(),
            enable_partials: config.enable_partials,
            operating_point: OPERATING_POINT.to_string(),
            enable_entities: true,
            speaker_diarization: DIARIZATION_MODE.to_string(),
            diarization_max_speakers: DIARIZATION_MAX_SPEAKERS,
            max_delay: config.max_delay.filter(|delay| *delay > 0.0),
        },
    }
}

pub fn add_audio(frame: &[u8], seq_no: u64) -> ClientMessage {
    ClientMessage::AddAudio {
        data: base64::engine::general_purpose::STANDARD.encode(frame),
        seq_no,
    }
}

pub fn end_of_stream(last_seq_no: u64) -> ClientMessage {
    ClientMessage::EndOfStream { last_seq_no }
}

/// Serialize a client message into one text frame
pub fn encode(message: &ClientMessage) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

/// Classify one inbound text frame.
///
/// Malformed frames and unknown message kinds are logged and skipped.
pub fn classify(raw: &str) -> Inbound {
    let message = match serde_json::from_str::<ServerMessage>(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to parse upstream message: {}", e);
            return Inbound::Skip;
        }
    };

    match message {
        ServerMessage::RecognitionStarted { id } => {
            info!("Recognition started (id={})", id.as_deref().unwrap_or("-"));
            Inbound::Skip
        }
        ServerMessage::AddTranscript { metadata } => {
            transcript(metadata.transcript, TranscriptEvent::final_text)
        }
        ServerMessage::AddPartialTranscript { metadata } => {
            transcript(metadata.transcript, TranscriptEvent::partial)
        }
        ServerMessage::EndOfTranscript => {
            info!("End of transcript received");
            Inbound::EndOfTranscript
        }
        ServerMessage::Error(notice) => {
            warn!("Upstream error: {}", describe(&notice));
            Inbound::Fatal(raw.to_string())
        }
        ServerMessage::Warning(notice) => {
            warn!("Upstream warning: {}", describe(&notice));
            Inbound::Skip
        }
        ServerMessage::Info(notice) => {
            info!("Upstream info: {}", describe(&notice));
            Inbound::Skip
        }
        ServerMessage::AudioAdded { seq_no } => {
            trace!("Audio acknowledged (seq_no={:?})", seq_no);
            Inbound::Skip
        }
        ServerMessage::Unknown => {
            debug!("Ignoring unrecognized upstream message");
            Inbound::Skip
        }
    }
}

fn transcript(text: String, build: fn(String) -> TranscriptEvent) -> Inbound {
    if text.is_empty() {
        Inbound::Skip
    } else {
        Inbound::Transcript(build(text))
    }
}

fn describe(notice: &Notice) -> String {
    format!(
        "type={} reason={}",
        notice.kind.as_deref().unwrap_or("unknown"),
        notice.reason.as_deref().unwrap_or("")
    )
}
