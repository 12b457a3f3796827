use super::channel::relay_events;
use super::frame::TaggedFrame;
use crate::error::BridgeError;
use crate::session::{SessionStats, StreamingBridge, StreamingConfig};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run a session over a single tagged frame stream.
///
/// The first frame is configuration only when tagged with
/// [`CONFIG_TYPE`](super::frame::CONFIG_TYPE); otherwise the default
/// configuration is used and that frame is treated as audio. Transcripts are
/// sent back as tagged frames. `outbound` is closed when this returns.
pub async fn transcribe_stream<S, E>(
    bridge: &StreamingBridge,
    cancel: CancellationToken,
    mut inbound: S,
    outbound: mpsc::Sender<TaggedFrame>,
) -> Result<SessionStats, BridgeError>
where
    S: Stream<Item = Result<TaggedFrame, E>> + Send + Unpin,
    E: Display + Send,
{
    info!("TranscribeStream started");

    let first = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
        first = inbound.next() => first,
    };

    let (config, first_audio) = match first {
        None => {
            info!("Inbound stream ended before any frame, no session opened");
            return Ok(SessionStats::idle());
        }
        Some(Err(e)) => {
            return Err(BridgeError::Downstream(format!("failed to receive: {}", e)));
        }
        Some(Ok(frame)) if frame.is_config() => {
            let config = StreamingConfig::from_payload(&frame.value)?;
            info!("Received config: {:?}", config);
            (config, None)
        }
        Some(Ok(frame)) => {
            warn!("First frame is not tagged as config, using default configuration");
            (StreamingConfig::default(), Some(frame.value))
        }
    };

    let session = cancel.child_token();
    let (audio_tx, audio_rx) = mpsc::channel(bridge.settings().audio_buffer);
    let (event_tx, event_rx) = mpsc::channel(bridge.settings().event_buffer);

    let run = async {
        let result = bridge.run(session.clone(), config, audio_rx, event_tx).await;
        // Stop reading inbound frames once the session is over
        session.cancel();
        result
    };

    let (inbound_result, session_result, relay_result) = tokio::join!(
        forward_audio(inbound, first_audio, audio_tx, &session),
        run,
        relay_events(event_rx, outbound, &cancel, &session, TaggedFrame::from),
    );

    info!("TranscribeStream finished");

    inbound_result?;
    relay_result?;
    session_result
}

/// Forward inbound frames as audio; dropping `audio` on exit closes the channel
async fn forward_audio<S, E>(
    mut inbound: S,
    first_audio: Option<Vec<u8>>,
    audio: mpsc::Sender<Vec<u8>>,
    session: &CancellationToken,
) -> Result<(), BridgeError>
where
    S: Stream<Item = Result<TaggedFrame, E>> + Unpin,
    E: Display + Send,
{
    let mut forwarded = 0usize;

    if let Some(frame) = first_audio.filter(|frame| !frame.is_empty()) {
        if !send_audio(&audio, frame, session).await {
            return Ok(());
        }
        forwarded += 1;
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = session.cancelled() => break,
            next = inbound.next() => next,
        };

        match next {
            None => {
                debug!("Inbound stream ended after {} audio frames", forwarded);
                break;
            }
            Some(Err(e)) => {
                session.cancel();
                return Err(BridgeError::Downstream(format!("failed to receive: {}", e)));
            }
            Some(Ok(frame)) => {
                if frame.value.is_empty() {
                    continue;
                }
                if !send_audio(&audio, frame.value, session).await {
                    break;
                }
                forwarded += 1;
            }
        }
    }

    Ok(())
}

/// Returns false once the session no longer accepts audio
async fn send_audio(
    audio: &mpsc::Sender<Vec<u8>>,
    frame: Vec<u8>,
    session: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = session.cancelled() => false,
        sent = audio.send(frame) => sent.is_ok(),
    }
}
