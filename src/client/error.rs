// Client errors

use thiserror::Error;

/// Error of a client operation
#[derive(Debug, Error)]
pub enum RtmpClientError {
    /// Socket error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation did not complete within the configured time
    #[error("operation timed out")]
    Timeout,

    /// The URL is not a valid rtmp:// URL
    #[error("invalid rtmp url")]
    InvalidUrl,

    /// The handshake could not be completed
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The peer sent something the client could not understand
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server refused the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The connection was closed
    #[error("connection closed")]
    Closed,
}
