//! ARCHIVE wire protocol.
//!
//! Deterministic binary encode/decode of framed, CRC-protected, typed-
//! parameter messages for realtime multiplayer sessions. This crate is the
//! stateless wire layer: no I/O, no async, no session state.
//!
//! # Wire format
//!
//! ```text
//! [messageType: u8][opCode: u8][payloadLen: u16 LE]  header (4 bytes)
//! [code: u8][dataType: u8][value...]  repeated       payload (payloadLen)
//! [crc16 of header+payload: u16 LE]                  trailer (2 bytes)
//! ```
//!
//! All multi-byte integers are little-endian. The CRC is the bitwise
//! polynomial-0xA001 CRC-16 (init 0xFFFF, no final xor) - see [`crc`].
//!
//! # Example
//!
//! ```
//! use archive_proto::{Frame, MessageType, ParamCode, Params, RoomOp};
//!
//! let mut params = Params::new();
//! params.insert(ParamCode::PlayerId, 66i32);
//! params.insert(ParamCode::RoomId, "Game");
//!
//! let frame = Frame::new(MessageType::Room, RoomOp::Join.to_u8(), params);
//! let wire = frame.encode()?;
//! assert_eq!(Frame::decode(&wire)?, frame);
//! # Ok::<(), archive_proto::CodecError>(())
//! ```

pub mod crc;
pub mod errors;
mod frame;
mod names;
mod params;
mod value;

pub use errors::{CodecError, Result};
pub use frame::Frame;
pub use names::{EventOp, MessageType, ParamCode, RoomOp, SystemOp, operation_name};
pub use params::Params;
pub use value::{DataType, MAX_CHUNK_LEN, MAX_DICT_DEPTH, Value};
