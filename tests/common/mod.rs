// Scripted in-memory upstream recognizer for bridge tests
//
// The mock records every frame the bridge sends and replays a fixed list of
// upstream replies, either right after connecting or once EndOfStream
// arrives (as a real recognizer would finish after the last audio).

#![allow(dead_code)]

use async_trait::async_trait;
use dreamtrans_bridge::upstream::{Connector, Transport, TransportSink, TransportStream};
use dreamtrans_bridge::{
    BridgeError, BridgeSettings, StaticCredential, StreamingBridge, TranscriptEvent,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const TEST_CREDENTIAL: &str = "test-key";

#[derive(Debug, Clone)]
pub enum Reply {
    /// A text frame delivered to the read pump
    Text(String),
    /// A transport-level read failure
    ReadError(String),
    /// Upstream closes the connection
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Immediately,
    OnEndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFault {
    /// The nth send (1-based) fails with a transport error
    FailAt(usize),
    /// The nth send (1-based) and every later one never completes
    StallAt(usize),
}

#[derive(Clone)]
pub struct MockUpstream {
    script: Vec<Reply>,
    release: Release,
    fail_connect: bool,
    fault: Option<SendFault>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub credentials: Arc<Mutex<Vec<String>>>,
    pub connects: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn new(release: Release, script: Vec<Reply>) -> Self {
        Self {
            script,
            release,
            fail_connect: false,
            fault: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            credentials: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn refusing_connections() -> Self {
        let mut upstream = Self::new(Release::Immediately, Vec::new());
        upstream.fail_connect = true;
        upstream
    }

    pub fn with_fault(mut self, fault: SendFault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn bridge(&self) -> StreamingBridge {
        self.bridge_with(BridgeSettings::default())
    }

    pub fn bridge_with(&self, settings: BridgeSettings) -> StreamingBridge {
        StreamingBridge::new(
            Arc::new(self.clone()),
            Arc::new(StaticCredential::new(TEST_CREDENTIAL)),
            settings,
        )
    }

    /// Every frame sent so far, parsed as JSON
    pub fn sent_messages(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("bridge sent invalid JSON"))
            .collect()
    }

    /// The `message` discriminant of every frame sent so far
    pub fn sent_kinds(&self) -> Vec<String> {
        self.sent_messages()
            .iter()
            .map(|msg| msg["message"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Wait until the bridge has sent at least `count` frames
    pub async fn wait_for_sent(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.sent.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("bridge did not send the expected frames in time");
    }
}

#[async_trait]
impl Connector for MockUpstream {
    async fn connect(&self, credential: &str) -> Result<Transport, BridgeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().unwrap().push(credential.to_string());

        if self.fail_connect {
            return Err(BridgeError::Handshake(
                "failed to connect to WebSocket: connection refused".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut sink = MockSink {
            sent: Arc::clone(&self.sent),
            closes: Arc::clone(&self.closes),
            replies: Some(tx),
            pending: Vec::new(),
            fault: self.fault,
        };

        match self.release {
            Release::Immediately => sink.release(self.script.clone()),
            Release::OnEndOfStream => sink.pending = self.script.clone(),
        }

        Ok(Transport {
            sink: Box::new(sink),
            stream: Box::new(MockStream { rx }),
        })
    }
}

struct MockSink {
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
    replies: Option<mpsc::UnboundedSender<Result<String, BridgeError>>>,
    pending: Vec<Reply>,
    fault: Option<SendFault>,
}

impl MockSink {
    fn release(&mut self, script: Vec<Reply>) {
        for reply in script {
            let Some(tx) = self.replies.as_ref() else {
                return;
            };
            match reply {
                Reply::Text(text) => {
                    let _ = tx.send(Ok(text));
                }
                Reply::ReadError(reason) => {
                    let _ = tx.send(Err(BridgeError::Transport(reason)));
                }
                Reply::Close => {
                    self.replies = None;
                }
            }
        }
    }
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send(&mut self, frame: String) -> Result<(), BridgeError> {
        let attempt = self.sent.lock().unwrap().len() + 1;

        match self.fault {
            Some(SendFault::FailAt(n)) if attempt == n => {
                return Err(BridgeError::Transport("broken pipe".to_string()));
            }
            Some(SendFault::StallAt(n)) if attempt >= n => {
                std::future::pending::<()>().await;
            }
            _ => {}
        }

        let is_end = frame.contains("\"EndOfStream\"");
        self.sent.lock().unwrap().push(frame);

        if is_end {
            let pending = std::mem::take(&mut self.pending);
            self.release(pending);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.replies = None;
        Ok(())
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<Result<String, BridgeError>>,
}

#[async_trait]
impl TransportStream for MockStream {
    async fn next_frame(&mut self) -> Option<Result<String, BridgeError>> {
        self.rx.recv().await
    }
}

// Upstream message builders

pub fn final_msg(text: &str) -> Reply {
    Reply::Text(
        serde_json::json!({
            "message": "AddTranscript",
            "metadata": { "transcript": text, "start_time": 0.0, "end_time": 1.0 },
            "results": []
        })
        .to_string(),
    )
}

pub fn partial_msg(text: &str) -> Reply {
    Reply::Text(
        serde_json::json!({
            "message": "AddPartialTranscript",
            "metadata": { "transcript": text },
            "results": []
        })
        .to_string(),
    )
}

pub fn started_msg() -> Reply {
    Reply::Text(r#"{"message":"RecognitionStarted","id":"807670e9-14af-4fa2-9e8f-5d525c22156e"}"#.to_string())
}

pub fn end_msg() -> Reply {
    Reply::Text(r#"{"message":"EndOfTranscript"}"#.to_string())
}

pub const UPSTREAM_ERROR: &str =
    r#"{"message":"Error","type":"data_error","reason":"Audio data could not be decoded"}"#;

pub fn error_msg() -> Reply {
    Reply::Text(UPSTREAM_ERROR.to_string())
}

pub fn raw(text: &str) -> Reply {
    Reply::Text(text.to_string())
}

/// An audio channel already holding `frames` and closed afterwards
pub fn audio_source(frames: &[&[u8]]) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(frames.len().max(1));
    for frame in frames {
        tx.try_send(frame.to_vec()).expect("audio channel has room");
    }
    rx
}

pub async fn collect_events(mut rx: mpsc::Receiver<TranscriptEvent>) -> Vec<TranscriptEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
