//! Frame encode/decode.
//!
//! A frame is a 4-byte header (`messageType:u8`, `operationCode:u8`,
//! `payloadLength:u16 LE`), the parameter payload, and a trailing CRC-16 of
//! header+payload appended u16 LE. Total wire length is always
//! `payloadLength + 6`.
//!
//! The header stores raw bytes: unknown message types and opcodes decode
//! structurally and the enum views return `None`, leaving the drop/catch-all
//! decision to the dispatcher.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    crc::crc16,
    errors::{CodecError, Result},
    names::{MessageType, operation_name},
    params::Params,
    value::{DataType, Value},
};

/// One decoded (or to-be-encoded) ARCHIVE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw message-type byte
    type_code: u8,
    /// Raw operation code (namespaced per message type)
    op_code: u8,
    /// Typed parameters
    params: Params,
}

impl Frame {
    /// Header length in bytes.
    pub const HEADER_LEN: usize = 4;

    /// Trailing CRC length in bytes.
    pub const CRC_LEN: usize = 2;

    /// Fixed per-frame overhead (header + CRC).
    pub const OVERHEAD: usize = Self::HEADER_LEN + Self::CRC_LEN;

    /// Maximum payload length (u16 length field).
    pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

    /// Create a frame with a known message type.
    #[must_use]
    pub fn new(message_type: MessageType, op_code: u8, params: Params) -> Self {
        Self { type_code: message_type.to_u8(), op_code, params }
    }

    /// Create a frame from raw header bytes.
    #[must_use]
    pub fn from_raw(type_code: u8, op_code: u8, params: Params) -> Self {
        Self { type_code, op_code, params }
    }

    /// Raw message-type byte.
    #[must_use]
    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    /// Raw operation code.
    #[must_use]
    pub fn op_code(&self) -> u8 {
        self.op_code
    }

    /// Message type as enum. `None` if the byte is outside the closed set.
    #[must_use]
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u8(self.type_code)
    }

    /// Canonical message-type name, `"UNKNOWN"` outside the closed set.
    #[must_use]
    pub fn message_type_name(&self) -> &'static str {
        self.message_type().map_or("UNKNOWN", MessageType::name)
    }

    /// Canonical operation name within this frame's namespace.
    #[must_use]
    pub fn operation_name(&self) -> &'static str {
        self.message_type().map_or("UNKNOWN", |mt| operation_name(mt, self.op_code))
    }

    /// Frame parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Mutable frame parameters.
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Consume the frame, returning its parameters.
    #[must_use]
    pub fn into_params(self) -> Params {
        self.params
    }

    /// Encode to wire bytes: header, parameters in insertion order, CRC.
    ///
    /// # Errors
    ///
    /// `CodecError::ValueOutOfRange` if a value exceeds its length prefix or
    /// the total payload exceeds [`Self::MAX_PAYLOAD_LEN`].
    pub fn encode(&self) -> Result<Bytes> {
        let mut payload = Vec::new();
        for (code, value) in &self.params {
            payload.put_u8(code);
            payload.put_u8(value.data_type().to_u8());
            value.encode_into(&mut payload)?;
        }

        if payload.len() > Self::MAX_PAYLOAD_LEN {
            return Err(CodecError::ValueOutOfRange(format!(
                "payload of {} bytes exceeds {}",
                payload.len(),
                Self::MAX_PAYLOAD_LEN
            )));
        }

        let mut wire = BytesMut::with_capacity(payload.len() + Self::OVERHEAD);
        wire.put_u8(self.type_code);
        wire.put_u8(self.op_code);
        wire.put_u16_le(payload.len() as u16);
        wire.put_slice(&payload);

        let crc = crc16(&wire);
        wire.put_u16_le(crc);

        Ok(wire.freeze())
    }

    /// Decode wire bytes into a frame.
    ///
    /// Validates total length against the header's payload length, then the
    /// trailing CRC against header+payload, then parses parameters. Duplicate
    /// parameter codes collapse last-write-wins.
    ///
    /// # Errors
    ///
    /// - `CodecError::Truncated` on short input or a length mismatch
    /// - `CodecError::Crc` on checksum mismatch
    /// - `CodecError::UnknownType` on a data-type byte outside the table
    /// - `CodecError::BadString` on invalid UTF-8 in a STRING
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::OVERHEAD {
            return Err(CodecError::Truncated { expected: Self::OVERHEAD, actual: bytes.len() });
        }

        let mut header = &bytes[..Self::HEADER_LEN];
        let type_code = header.get_u8();
        let op_code = header.get_u8();
        let payload_len = header.get_u16_le() as usize;

        let total = payload_len + Self::OVERHEAD;
        if bytes.len() != total {
            return Err(CodecError::Truncated { expected: total, actual: bytes.len() });
        }

        let crc_offset = Self::HEADER_LEN + payload_len;
        let computed = crc16(&bytes[..crc_offset]);
        let mut trailer = &bytes[crc_offset..];
        let found = trailer.get_u16_le();
        if computed != found {
            return Err(CodecError::Crc { computed, found });
        }

        let mut src = &bytes[Self::HEADER_LEN..crc_offset];
        let mut params = Params::new();
        while !src.is_empty() {
            let code = src.get_u8();
            if src.is_empty() {
                return Err(CodecError::Truncated { expected: 1, actual: 0 });
            }
            let type_byte = src.get_u8();
            let data_type =
                DataType::from_u8(type_byte).ok_or(CodecError::UnknownType(type_byte))?;
            let value = Value::decode_from(data_type, &mut src)?;
            params.insert(code, value);
        }

        Ok(Self { type_code, op_code, params })
    }
}
