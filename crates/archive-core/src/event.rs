//! Embedder-visible error events.
//!
//! A connection surfaces three observable events: a decoded `message`, an
//! `error`, and a terminal `closed`. Messages travel as
//! [`ConnectionAction::Deliver`](crate::connection::ConnectionAction::Deliver)
//! and `closed` is reported by the runtime when the transport terminates;
//! this module defines the error surface.

use thiserror::Error;

/// Classification of a surfaced error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A frame failed to decode; the connection continues
    ParseError,
    /// The transport failed; terminal for the connection
    ConnectionError,
    /// An outbound write failed
    SendError,
    /// A retransmission write failed
    RetransmitError,
    /// A reliable send exhausted its retries; terminal for that sequence
    TransmissionFailed,
}

impl ErrorKind {
    /// Canonical event name as surfaced to embedders.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ParseError => "PARSE_ERROR",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::SendError => "SEND_ERROR",
            Self::RetransmitError => "RETRANSMIT_ERROR",
            Self::TransmissionFailed => "TRANSMISSION_FAILED",
        }
    }
}

/// One error event surfaced to the embedder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", kind.name())]
pub struct ErrorEvent {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
    /// Sequence number, for reliability errors
    pub sequence: Option<u32>,
}

impl ErrorEvent {
    /// Create an event without a sequence number.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), sequence: None }
    }

    /// Create an event tied to a reliable sequence number.
    #[must_use]
    pub fn for_sequence(kind: ErrorKind, message: impl Into<String>, sequence: u32) -> Self {
        Self { kind, message: message.into(), sequence: Some(sequence) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_display_includes_kind_name() {
        let event = ErrorEvent::for_sequence(ErrorKind::TransmissionFailed, "gave up", 7);
        assert_eq!(event.to_string(), "TRANSMISSION_FAILED: gave up");
        assert_eq!(event.sequence, Some(7));
    }
}
