use crate::error::BridgeError;
use crate::session::{SessionStats, StreamingBridge, StreamingConfig, TranscriptEvent};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run a session over a plain channel pair with configuration passed as attributes.
///
/// Each transcript is delivered to `output` as its raw UTF-8 text. `output`
/// is closed when this returns.
pub async fn execute_stream(
    bridge: &StreamingBridge,
    cancel: CancellationToken,
    attributes: &HashMap<String, String>,
    input: mpsc::Receiver<Vec<u8>>,
    output: mpsc::Sender<Vec<u8>>,
) -> Result<SessionStats, BridgeError> {
    let config = StreamingConfig::from_attributes(attributes)?;
    info!("Resolved streaming config from attributes: {:?}", config);

    let session = cancel.child_token();
    let (event_tx, event_rx) = mpsc::channel(bridge.settings().event_buffer);

    let (session_result, relay_result) = tokio::join!(
        bridge.run(session.clone(), config, input, event_tx),
        relay_events(event_rx, output, &cancel, &session, |event| {
            event.text.into_bytes()
        }),
    );

    relay_result?;
    session_result
}

/// Copy transcript events to the caller's sink until the bridge closes them.
///
/// A dropped sink cancels `session`. Only the caller's own `cancel` stops the
/// relay early, so events already produced are delivered on a clean finish.
pub(crate) async fn relay_events<T>(
    mut events: mpsc::Receiver<TranscriptEvent>,
    output: mpsc::Sender<T>,
    cancel: &CancellationToken,
    session: &CancellationToken,
    encode: impl Fn(TranscriptEvent) -> T,
) -> Result<(), BridgeError> {
    let mut relayed = 0usize;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            break;
        };

        debug!("Relaying {:?} transcript: {}", event.kind, event.text);

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = output.send(encode(event)) => sent,
        };
        if sent.is_err() {
            session.cancel();
            return Err(BridgeError::Downstream(
                "transcript output channel closed".to_string(),
            ));
        }
        relayed += 1;
    }

    debug!("Relay finished after {} transcripts", relayed);
    Ok(())
}
