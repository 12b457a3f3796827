use crate::error::BridgeError;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

/// Default realtime recognition endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://eu2.rt.speechmatics.com/v2";

/// Write half of an upstream connection
#[async_trait]
pub trait TransportSink: Send {
    /// Send one JSON text frame
    async fn send(&mut self, frame: String) -> Result<(), BridgeError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), BridgeError>;
}

/// Read half of an upstream connection
#[async_trait]
pub trait TransportStream: Send {
    /// Next text frame; `None` once upstream has closed the connection
    async fn next_frame(&mut self) -> Option<Result<String, BridgeError>>;
}

/// A connected upstream session split into independently driven halves
pub struct Transport {
    pub sink: Box<dyn TransportSink>,
    pub stream: Box<dyn TransportStream>,
}

/// Opens upstream connections
///
/// Implementations:
/// - `WsConnector`: secure WebSocket to the recognition service
/// - tests: scripted in-memory upstream
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credential: &str) -> Result<Transport, BridgeError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector; the credential travels as the `jwt` query parameter
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: Url,
}

impl WsConnector {
    pub fn new(endpoint: &str) -> Result<Self, BridgeError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| BridgeError::Handshake(format!("invalid endpoint {}: {}", endpoint, e)))?;
        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn session_url(&self, credential: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("jwt", credential);
        url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, credential: &str) -> Result<Transport, BridgeError> {
        info!("Connecting to recognizer at {}", self.endpoint);

        let url = self.session_url(credential);
        let (ws, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| BridgeError::Handshake(format!("failed to connect to WebSocket: {}", e)))?;

        info!("Connected to recognizer (status={})", response.status());

        let (sink, stream) = ws.split();
        Ok(Transport {
            sink: Box::new(WsSink { sink }),
            stream: Box::new(WsSource { stream }),
        })
    }
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl TransportSink for WsSink {
    async fn send(&mut self, frame: String) -> Result<(), BridgeError> {
        self.sink
            .send(Message::Text(frame))
            .await
            .map_err(|e| BridgeError::Transport(format!("WebSocket write error: {}", e)))
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.sink
            .close()
            .await
            .map_err(|e| BridgeError::Transport(format!("WebSocket close error: {}", e)))
    }
}

struct WsSource {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl TransportStream for WsSource {
    async fn next_frame(&mut self) -> Option<Result<String, BridgeError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(WsError::ConnectionClosed)
                | Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                    debug!("Upstream connection ended without a close frame");
                    return None;
                }
                Err(e) => {
                    return Some(Err(BridgeError::Transport(format!(
                        "WebSocket read error: {}",
                        e
                    ))))
                }
            };

            match message {
                Message::Text(text) => return Some(Ok(text)),
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("Dropping non UTF-8 binary frame from upstream"),
                },
                Message::Close(frame) => return close_outcome(frame),
                // Pings are answered by tungstenite on the next write
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}

/// Going-away and normal closes end the session cleanly; any other code is a
/// transport failure carrying the code and reason.
fn close_outcome(frame: Option<CloseFrame<'_>>) -> Option<Result<String, BridgeError>> {
    let Some(frame) = frame else {
        debug!("Upstream closed the connection without a code");
        return None;
    };

    match frame.code {
        CloseCode::Away | CloseCode::Normal => {
            debug!(
                "Upstream closed the connection ({} {})",
                u16::from(frame.code),
                frame.reason
            );
            None
        }
        code => {
            warn!(
                "Upstream closed the connection with {} {}",
                u16::from(code),
                frame.reason
            );
            Some(Err(BridgeError::Transport(format!(
                "upstream closed the connection: {} {}",
                u16::from(code),
                frame.reason
            ))))
        }
    }
}
