use super::config::{BridgeSettings, StreamingConfig};
use super::stats::{SessionState, SessionStats, TranscriptEvent};
use crate::auth::CredentialProvider;
use crate::error::BridgeError;
use crate::upstream::messages::ClientMessage;
use crate::upstream::protocol::{self, Inbound};
use crate::upstream::{Connector, Transport, TransportSink, TransportStream};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Relays audio to the upstream recognizer and transcripts back to the caller.
///
/// One bridge can run many sessions; each call to [`StreamingBridge::run`]
/// opens its own upstream connection and closes it before returning.
#[derive(Clone)]
pub struct StreamingBridge {
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialProvider>,
    settings: BridgeSettings,
}

/// Sent by each pump when it stops
#[derive(Debug)]
enum PumpExit {
    Writer(Result<(), BridgeError>),
    Reader(Result<(), BridgeError>),
}

/// Returned by the write pump so the control loop can finish the connection
struct WriteHalf {
    sink: Box<dyn TransportSink>,
    frames_sent: u64,
    end_sent: bool,
}

#[derive(Debug, Default)]
struct ReadCounts {
    partials: usize,
    finals: usize,
}

impl StreamingBridge {
    pub fn new(
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialProvider>,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            connector,
            credentials,
            settings,
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Run one streaming session to completion.
    ///
    /// Audio frames from `audio` are sent upstream in order; transcripts are
    /// delivered to `events` in the order upstream emits them. `events` is
    /// closed when this returns. Cancelling `cancel` stops the session and
    /// yields [`BridgeError::Cancelled`].
    pub async fn run(
        &self,
        cancel: CancellationToken,
        config: StreamingConfig,
        audio: mpsc::Receiver<Vec<u8>>,
        events: mpsc::Sender<TranscriptEvent>,
    ) -> Result<SessionStats, BridgeError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("session", id = %session_id);

        self.run_session(session_id, cancel, config, audio, events)
            .instrument(span)
            .await
    }

    async fn run_session(
        &self,
        session_id: String,
        cancel: CancellationToken,
        config: StreamingConfig,
        audio: mpsc::Receiver<Vec<u8>>,
        events: mpsc::Sender<TranscriptEvent>,
    ) -> Result<SessionStats, BridgeError> {
        let started_at = Utc::now();
        let mut state = SessionState::Idle;

        info!(
            "Starting streaming session (language={}, partials={}, max_delay={:?})",
            config.language, config.enable_partials, config.max_delay
        );

        transition(&mut state, SessionState::Handshaking);
        let Transport { sink, stream } = match self.open(&cancel, &config).await {
            Ok(transport) => transport,
            Err(e) => {
                transition(&mut state, final_state(&e));
                return Err(e);
            }
        };

        transition(&mut state, SessionState::Streaming);

        let pump_cancel = cancel.child_token();
        let (exit_tx, mut exit_rx) = mpsc::channel(2);

        let writer = tokio::spawn(
            write_pump(
                sink,
                audio,
                pump_cancel.clone(),
                self.settings.write_timeout,
                exit_tx.clone(),
            )
            .instrument(Span::current()),
        );
        let reader = tokio::spawn(
            read_pump(
                stream,
                events,
                pump_cancel.clone(),
                self.settings.read_timeout,
                exit_tx,
            )
            .instrument(Span::current()),
        );

        let outcome = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Streaming session cancelled");
                    break Err(BridgeError::Cancelled);
                }

                exit = exit_rx.recv() => match exit {
                    Some(PumpExit::Reader(result)) => break result,
                    Some(PumpExit::Writer(Ok(()))) => {
                        debug!("Audio input drained, waiting for upstream to finish");
                    }
                    Some(PumpExit::Writer(Err(e))) => break Err(e),
                    None => {
                        break Err(BridgeError::Transport(
                            "session pumps stopped unexpectedly".to_string(),
                        ));
                    }
                },
            }
        };

        transition(&mut state, SessionState::Draining);
        pump_cancel.cancel();

        let counts = reader.await.unwrap_or_else(|e| {
            error!("Read pump panicked: {}", e);
            ReadCounts::default()
        });

        // Cancelled sessions drain under the shorter deadline
        let cancelled = matches!(outcome, Err(BridgeError::Cancelled));
        let drain_deadline = if cancelled {
            self.settings.drain_timeout.min(self.settings.write_timeout)
        } else {
            self.settings.write_timeout
        };

        let frames_sent = match writer.await {
            Ok(mut half) => {
                if cancelled && !half.end_sent {
                    // Best effort; the connection may already be gone
                    let end = protocol::end_of_stream(half.frames_sent);
                    if let Err(e) = send_message(half.sink.as_mut(), &end, drain_deadline).await {
                        warn!("Failed to send EndOfStream: {}", e);
                    }
                }
                close_sink(half.sink.as_mut(), drain_deadline).await;
                half.frames_sent
            }
            Err(e) => {
                error!("Write pump panicked: {}", e);
                0
            }
        };

        match outcome {
            Ok(()) => {
                transition(&mut state, SessionState::Closed);
                let stats = SessionStats {
                    session_id,
                    started_at,
                    duration_secs: Utc::now()
                        .signed_duration_since(started_at)
                        .num_milliseconds() as f64
                        / 1000.0,
                    frames_sent,
                    partials_forwarded: counts.partials,
                    finals_forwarded: counts.finals,
                    state,
                };
                info!(
                    "Streaming session finished ({} frames sent, {} transcripts delivered)",
                    stats.frames_sent,
                    stats.events_forwarded()
                );
                Ok(stats)
            }
            Err(e) => {
                transition(&mut state, final_state(&e));
                if !e.is_cancelled() {
                    error!("Streaming session failed: {}", e);
                }
                Err(e)
            }
        }
    }

    /// Obtain a credential, connect, and send the StartRecognition handshake
    async fn open(
        &self,
        cancel: &CancellationToken,
        config: &StreamingConfig,
    ) -> Result<Transport, BridgeError> {
        let credential = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
            credential = self.credentials.credential() => credential?,
        };

        let mut transport = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
            connected = timeout(self.settings.connect_timeout, self.connector.connect(&credential)) => {
                match connected {
                    Ok(transport) => transport?,
                    Err(_) => {
                        return Err(BridgeError::Handshake(format!(
                            "connect timed out after {:?}",
                            self.settings.connect_timeout
                        )))
                    }
                }
            }
        };

        let handshake = protocol::start_recognition(config);
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
            sent = send_message(transport.sink.as_mut(), &handshake, self.settings.write_timeout) => {
                sent.map_err(|e| BridgeError::Handshake(format!("failed to send StartRecognition: {}", e)))
            }
        };

        match sent {
            Ok(()) => {
                info!("StartRecognition sent");
                Ok(transport)
            }
            Err(e) => {
                close_sink(transport.sink.as_mut(), self.settings.write_timeout).await;
                Err(e)
            }
        }
    }
}

/// Forward audio frames upstream until the source ends or the pump is cancelled
async fn write_pump(
    mut sink: Box<dyn TransportSink>,
    mut audio: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
    write_timeout: Duration,
    exits: mpsc::Sender<PumpExit>,
) -> WriteHalf {
    let mut seq_no: u64 = 0;
    let mut end_sent = false;

    let result = loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(()),
            frame = audio.recv() => frame,
        };

        let Some(frame) = frame else {
            info!("Audio input closed after {} frames, sending EndOfStream", seq_no);
            let end = protocol::end_of_stream(seq_no);
            match send_message(sink.as_mut(), &end, write_timeout).await {
                Ok(()) => {
                    end_sent = true;
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        let message = protocol::add_audio(&frame, seq_no);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(()),
            sent = send_message(sink.as_mut(), &message, write_timeout) => {
                if let Err(e) = sent {
                    error!("Failed to send audio frame {}: {}", seq_no, e);
                    break Err(e);
                }
            }
        }

        seq_no += 1;
    };

    // The control loop may already be gone; nothing left to report to
    let _ = exits.send(PumpExit::Writer(result)).await;

    WriteHalf {
        sink,
        frames_sent: seq_no,
        end_sent,
    }
}

/// Receive upstream messages and forward transcripts; owns the event sender
async fn read_pump(
    mut stream: Box<dyn TransportStream>,
    events: mpsc::Sender<TranscriptEvent>,
    cancel: CancellationToken,
    read_timeout: Duration,
    exits: mpsc::Sender<PumpExit>,
) -> ReadCounts {
    let mut counts = ReadCounts::default();

    let result = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(()),
            next = timeout(read_timeout, stream.next_frame()) => next,
        };

        let raw = match next {
            Ok(Some(Ok(raw))) => raw,
            Ok(Some(Err(e))) => break Err(e),
            Ok(None) => {
                info!("Upstream closed the connection");
                break Ok(());
            }
            Err(_) => {
                break Err(BridgeError::Transport(format!(
                    "no upstream message within {:?}",
                    read_timeout
                )))
            }
        };

        match protocol::classify(&raw) {
            Inbound::Transcript(event) => {
                let is_final = event.is_final();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break Ok(()),
                    sent = events.send(event) => {
                        if sent.is_err() {
                            break Err(BridgeError::Downstream(
                                "transcript receiver dropped".to_string(),
                            ));
                        }
                    }
                }
                if is_final {
                    counts.finals += 1;
                } else {
                    counts.partials += 1;
                }
            }
            Inbound::EndOfTranscript => break Ok(()),
            Inbound::Fatal(detail) => break Err(BridgeError::Upstream(detail)),
            Inbound::Skip => {}
        }
    };

    // Closes the caller's transcript channel
    drop(events);

    let _ = exits.send(PumpExit::Reader(result)).await;
    counts
}

async fn send_message(
    sink: &mut dyn TransportSink,
    message: &ClientMessage,
    deadline: Duration,
) -> Result<(), BridgeError> {
    let frame = protocol::encode(message)
        .map_err(|e| BridgeError::Transport(format!("failed to encode message: {}", e)))?;

    match timeout(deadline, sink.send(frame)).await {
        Ok(sent) => sent,
        Err(_) => Err(BridgeError::Transport(format!(
            "write deadline of {:?} exceeded",
            deadline
        ))),
    }
}

async fn close_sink(sink: &mut dyn TransportSink, deadline: Duration) {
    match timeout(deadline, sink.close()).await {
        Ok(Ok(())) => debug!("Upstream connection closed"),
        Ok(Err(e)) => warn!("Error while closing upstream connection: {}", e),
        Err(_) => warn!("Timed out closing upstream connection"),
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    debug!("Session state {} -> {}", state, next);
    *state = next;
}

fn final_state(error: &BridgeError) -> SessionState {
    if error.is_cancelled() {
        SessionState::Closed
    } else {
        SessionState::Failed
    }
}
