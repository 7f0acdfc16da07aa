//! Server error types.
//!
//! Strongly-typed errors for the driver and the production runtime. Codec
//! errors never appear here: the driver recovers them locally and reports
//! them to the embedder, per the propagation policy.

use thiserror::Error;

/// Errors from driver event processing and the production runtime.
#[derive(Error, Debug)]
pub enum ServerError {
    /// An event referenced a connection id with no live session
    #[error("session {0} not found")]
    SessionNotFound(u32),

    /// Underlying transport failure (terminal for the connection)
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid server configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
