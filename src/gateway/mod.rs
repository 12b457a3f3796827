//! Adapters between caller-facing transports and the streaming bridge
//!
//! - `execute_stream`: channel pair with configuration passed as attributes
//! - `transcribe_stream`: one tagged frame stream whose first frame may be
//!   configuration

mod channel;
mod frame;
mod tagged;

pub use channel::execute_stream;
pub use frame::{TaggedFrame, CONFIG_TYPE, PARTIAL_TRANSCRIPTION_TYPE, TRANSCRIPTION_TYPE};
pub use tagged::transcribe_stream;
