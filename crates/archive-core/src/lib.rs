//! ARCHIVE session layer.
//!
//! Per-connection protocol state in the sans-IO action style: the
//! [`Connection`] state machine consumes inbound bytes and the current
//! instant, and returns [`ConnectionAction`]s (transmit, deliver, error) for
//! a driver to execute. It owns the reliable-send tracker (pending-ack
//! table, retransmission deadlines, sequence counter) and the inbound ACK
//! discipline; it never touches a socket or a clock.
//!
//! The [`env::Environment`] trait abstracts time and randomness so the same
//! logic runs under real clocks in production and hand-constructed instants
//! in tests.

pub mod connection;
pub mod env;
pub mod event;

pub use connection::{
    Connection, ConnectionAction, DEFAULT_MAX_RETRIES, DEFAULT_RETRANSMIT_TIMEOUT, SendOptions,
};
pub use env::Environment;
pub use event::{ErrorEvent, ErrorKind};
