//! Error types for the RouterOS API client

use std::time::Duration;

use thiserror::Error;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error (missing endpoint, credentials, bad address)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or IO error
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection mid-word or mid-sentence
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Malformed framing or an unexpected reply word
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Login exchange ended in a `!trap`
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Receive deadline exceeded
    #[error("Read timeout after {0:?}")]
    Timeout(Duration),

    /// TLS setup or handshake error
    #[error("TLS error: {0}")]
    Tls(String),

    /// Session-level failure (pool backoff, unusable session)
    #[error("Session error: {0}")]
    Session(String),

    /// Address parsing error
    #[error("Address parse error")]
    AddrParse(#[from] std::net::AddrParseError),
}

impl From<rustls::Error> for AppError {
    fn from(error: rustls::Error) -> Self {
        Self::Tls(error.to_string())
    }
}

/// Convenient alias for Result with application error
pub type Result<T> = std::result::Result<T, AppError>;
