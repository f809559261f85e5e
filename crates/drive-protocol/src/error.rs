//! Transport Error Types

use thiserror::Error;

/// Errors that can occur on the command link
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Link could not be opened
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// Write attempted while the link is down
    #[error("Vehicle link is not connected")]
    NotConnected,

    /// Write did not complete in time
    #[error("Timeout writing command after {0}ms")]
    Timeout(u64),

    /// Write rejected by the link
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Link dropped underneath us
    #[error("Vehicle link disconnected")]
    Disconnected,
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => TransportError::Disconnected,
            _ => TransportError::WriteFailed(err.to_string()),
        }
    }
}

impl From<tokio_serial::Error> for TransportError {
    fn from(err: tokio_serial::Error) -> Self {
        TransportError::ConnectFailed(err.to_string())
    }
}
