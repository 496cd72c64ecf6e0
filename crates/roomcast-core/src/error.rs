use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Rpc(#[from] roomcast_rpc::Error),

    #[error("Handshake timed out after {}ms", .0.as_millis())]
    HandshakeTimeout(Duration),

    #[error("No credential available")]
    NoCredential,

    #[error("No async runtime available to drive the connection")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Config error: missing field");
    }

    #[test]
    fn test_error_display_handshake_timeout() {
        let err = Error::HandshakeTimeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Handshake timed out after 1500ms");
    }

    #[test]
    fn test_error_display_no_credential() {
        assert_eq!(Error::NoCredential.to_string(), "No credential available");
    }

    #[test]
    fn test_from_rpc_error() {
        let err: Error = roomcast_rpc::Error::Rejected("expired".to_string()).into();
        assert!(matches!(err, Error::Rpc(_)));
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
