//! Session layer state machine.
//!
//! One [`Connection`] per transport session. It owns the reliable-send
//! tracker and the inbound ACK discipline; it performs no I/O. Methods take
//! the current instant as input and return actions for the driver to
//! execute, which keeps the machine pure and makes timing tests
//! deterministic.
//!
//! # Reliability transitions
//!
//! ```text
//!             send(RELIABLE+SEQUENCE)
//!                      |
//!                      v
//!              ┌───────────────┐   ACK arrives    ┌──────────────┐
//!              │ pending entry │─────────────────>│ acknowledged │
//!              └───────────────┘                  └──────────────┘
//!                      │ deadline passes
//!                      v
//!         retry_count < max_retries ── yes ──> retransmit, rearm
//!                      │ no
//!                      v
//!          TRANSMISSION_FAILED { sequence }
//! ```
//!
//! Closing the connection drains the pending table without firing either
//! terminal transition.

use std::{
    collections::HashMap,
    ops::{Add, Sub},
    time::{Duration, Instant},
};

use archive_proto::{Frame, MessageType, ParamCode, Params, Value};
use bytes::Bytes;

use crate::event::{ErrorEvent, ErrorKind};

/// Default retransmission timeout for reliable sends.
pub const DEFAULT_RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Default retry bound for reliable sends.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// ACK frames carry the single implicit operation 0x01.
const ACK_OP: u8 = 0x01;

/// Per-send reliability options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Time to wait for an ACK before retransmitting
    pub timeout: Duration,
    /// Retransmissions allowed before the send is failed
    pub max_retries: u32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { timeout: DEFAULT_RETRANSMIT_TIMEOUT, max_retries: DEFAULT_MAX_RETRIES }
    }
}

/// Actions returned by the connection state machine.
///
/// The driver (server runtime or test harness) executes these in order:
/// `Transmit` writes bytes to the transport, `Deliver` hands a decoded
/// message to the dispatcher, `Error` surfaces an event to the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Write these bytes to the transport
    Transmit(Bytes),
    /// Emit this decoded message to the subscriber
    Deliver(Frame),
    /// Surface this error event to the embedder
    Error(ErrorEvent),
}

/// Bookkeeping for one in-flight reliable send.
#[derive(Debug, Clone)]
struct PendingAck<I> {
    /// Original encoded frame, retransmitted verbatim
    bytes: Bytes,
    /// Retransmissions performed so far
    retry_count: u32,
    /// When the next retransmission fires
    deadline: I,
    /// Rearm interval
    timeout: Duration,
    /// Retry bound
    max_retries: u32,
}

/// Per-session connection state machine.
///
/// Generic over the instant type so tests can run on virtual time.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Add<Duration, Output = I> + Sub<I, Output = Duration>,
{
    /// Set by [`Connection::close`]; sends become no-ops
    closed: bool,
    /// Outbound sequence counter; first emitted value is 1
    sequence: u32,
    /// In-flight reliable sends, keyed by sequence number
    pending: HashMap<u32, PendingAck<I>>,
    /// Last inbound activity
    last_activity: I,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Add<Duration, Output = I> + Sub<I, Output = Duration>,
{
    /// Create a new open connection.
    pub fn new(now: I) -> Self {
        Self { closed: false, sequence: 0, pending: HashMap::new(), last_activity: now }
    }

    /// Next outbound sequence number: `(seq + 1) mod 2^32`.
    ///
    /// Starts at 0, so the first emitted value is 1. Wrap is legal; the
    /// pending table keys on the wrapped value.
    pub fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Whether [`Connection::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Last instant an inbound frame was processed.
    #[must_use]
    pub fn last_activity(&self) -> I {
        self.last_activity
    }

    /// Number of in-flight reliable sends.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a reliable send for `sequence` is in flight.
    #[must_use]
    pub fn has_pending(&self, sequence: u32) -> bool {
        self.pending.contains_key(&sequence)
    }

    /// Send an encoded frame.
    ///
    /// Always transmits (unless closed). The frame is then re-decoded to
    /// inspect its header: a RELIABLE frame carrying a SEQUENCE parameter
    /// installs a pending-ack entry that [`Connection::tick`] retransmits
    /// until acknowledged or `options.max_retries` is exhausted.
    ///
    /// On a closed connection this is a no-op, not an error.
    pub fn send(&mut self, bytes: Bytes, options: SendOptions, now: I) -> Vec<ConnectionAction> {
        if self.closed {
            return Vec::new();
        }

        let actions = vec![ConnectionAction::Transmit(bytes.clone())];

        if let Ok(frame) = Frame::decode(&bytes) {
            if frame.message_type() == Some(MessageType::Reliable) {
                if let Some(sequence) =
                    frame.params().get(ParamCode::Sequence).and_then(Value::as_u32)
                {
                    self.pending.insert(sequence, PendingAck {
                        bytes,
                        retry_count: 0,
                        deadline: now + options.timeout,
                        timeout: options.timeout,
                        max_retries: options.max_retries,
                    });
                }
            }
        }

        actions
    }

    /// Process one inbound transport message.
    ///
    /// - Decode failures surface `PARSE_ERROR` and the connection continues.
    /// - ACK frames resolve their pending entry and are consumed (never
    ///   delivered). An ACK for an unknown sequence is a no-op.
    /// - RELIABLE frames carrying SEQUENCE are acknowledged before delivery,
    ///   so the ACK precedes any frame this peer sends in response.
    /// - Everything else is delivered to the subscriber as-is.
    pub fn handle_incoming(&mut self, bytes: &[u8], now: I) -> Vec<ConnectionAction> {
        if self.closed {
            return Vec::new();
        }

        self.last_activity = now;

        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                return vec![ConnectionAction::Error(ErrorEvent::new(
                    ErrorKind::ParseError,
                    e.to_string(),
                ))];
            },
        };

        if frame.message_type() == Some(MessageType::Ack) {
            if let Some(sequence) = frame.params().get(ParamCode::Sequence).and_then(Value::as_u32)
            {
                self.pending.remove(&sequence);
            }
            return Vec::new();
        }

        let mut actions = Vec::new();

        if frame.message_type() == Some(MessageType::Reliable) {
            if let Some(sequence) = frame.params().get(ParamCode::Sequence).and_then(Value::as_u32)
            {
                match ack_frame(sequence) {
                    Ok(ack) => actions.push(ConnectionAction::Transmit(ack)),
                    Err(e) => actions.push(ConnectionAction::Error(ErrorEvent::for_sequence(
                        ErrorKind::SendError,
                        e.to_string(),
                        sequence,
                    ))),
                }
            }
        }

        actions.push(ConnectionAction::Deliver(frame));
        actions
    }

    /// Drive retransmission deadlines.
    ///
    /// Every pending entry whose deadline has passed is either retransmitted
    /// (rearming the deadline) or, once `max_retries` is exhausted, erased
    /// with a `TRANSMISSION_FAILED` event for its sequence number.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.closed {
            return Vec::new();
        }

        // Stable order keeps retransmission deterministic under test
        let mut due: Vec<u32> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(seq, _)| *seq)
            .collect();
        due.sort_unstable();

        let mut actions = Vec::new();
        for sequence in due {
            let Some(entry) = self.pending.get_mut(&sequence) else {
                continue;
            };

            if entry.retry_count < entry.max_retries {
                entry.retry_count += 1;
                entry.deadline = now + entry.timeout;
                actions.push(ConnectionAction::Transmit(entry.bytes.clone()));
            } else {
                self.pending.remove(&sequence);
                actions.push(ConnectionAction::Error(ErrorEvent::for_sequence(
                    ErrorKind::TransmissionFailed,
                    format!("no ACK for sequence {sequence} after retries"),
                    sequence,
                )));
            }
        }

        actions
    }

    /// Close the connection.
    ///
    /// Idempotent. Drains the pending-ack table without firing callbacks;
    /// subsequent sends are no-ops.
    pub fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}

/// Build the ACK frame for `sequence`: type ACK, opcode 0x01, one UINT
/// SEQUENCE parameter.
fn ack_frame(sequence: u32) -> archive_proto::Result<Bytes> {
    let mut params = Params::new();
    params.insert(ParamCode::Sequence, Value::UInt(sequence));
    Frame::new(MessageType::Ack, ACK_OP, params).encode()
}
