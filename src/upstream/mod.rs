//! Upstream realtime recognizer
//!
//! - `messages`: JSON message shapes exchanged with the recognizer
//! - `protocol`: handshake construction and inbound event classification
//! - `transport`: connection traits and the WebSocket implementation

pub mod messages;
pub mod protocol;
pub mod transport;

pub use messages::{ClientMessage, ServerMessage};
pub use protocol::Inbound;
pub use transport::{
    Connector, Transport, TransportSink, TransportStream, WsConnector, DEFAULT_ENDPOINT,
};
