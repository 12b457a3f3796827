pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod upstream;

pub use auth::{CredentialProvider, EnvCredential, StaticCredential};
pub use config::Config;
pub use error::{BridgeError, ConfigError};
pub use gateway::{execute_stream, transcribe_stream, TaggedFrame};
pub use session::{
    BridgeSettings, SessionState, SessionStats, StreamingBridge, StreamingConfig,
    TranscriptEvent, TranscriptKind,
};
pub use upstream::{Connector, WsConnector};
