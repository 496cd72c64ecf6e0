//! Error types for the roomcast-rpc crate.

use crate::transport::CodecError;

/// Unified error type for protocol and transport operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid payload for '{event}': {message}")]
    InvalidPayload { event: String, message: String },

    #[error("Handshake rejected: {0}")]
    Rejected(String),

    #[error("Unexpected event during handshake: {0}")]
    UnexpectedEvent(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connection closed")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;
