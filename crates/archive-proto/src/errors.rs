//! Error types for the ARCHIVE wire layer.
//!
//! Codec errors are always local to one frame: a connection that hits one
//! reports it and keeps reading. The set is closed on purpose - every decode
//! failure an embedder can observe is one of these variants.

use thiserror::Error;

/// Convenience alias used throughout the wire layer.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced while encoding or decoding ARCHIVE frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Frame or parameter data ended before the declared length.
    #[error("truncated frame: need {expected} bytes, have {actual}")]
    Truncated {
        /// Bytes the structure declared
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Trailing CRC does not match the CRC of header+payload.
    #[error("crc mismatch: computed {computed:#06x}, frame carries {found:#06x}")]
    Crc {
        /// CRC recomputed over header+payload
        computed: u16,
        /// CRC carried in the trailing two bytes
        found: u16,
    },

    /// A parameter carried a data-type byte outside the wire table.
    #[error("unknown data type {0:#04x}")]
    UnknownType(u8),

    /// An encode request named a data-type byte with no defined wire form.
    #[error("unsupported data type {0:#04x}")]
    UnsupportedType(u8),

    /// A STRING parameter was not valid UTF-8.
    #[error("string parameter is not valid utf-8")]
    BadString,

    /// A value cannot be represented in the declared data type.
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_cleanly() {
        let err = CodecError::Crc { computed: 0x2592, found: 0x2593 };
        assert_eq!(err.to_string(), "crc mismatch: computed 0x2592, frame carries 0x2593");

        let err = CodecError::Truncated { expected: 14, actual: 6 };
        assert_eq!(err.to_string(), "truncated frame: need 14 bytes, have 6");
    }
}
