//! Typed parameter values.
//!
//! The wire type system is a closed 15-entry table. Every parameter value is
//! one variant of [`Value`]; the wire byte for each variant is [`DataType`].
//! Dictionaries recurse: keys and values are arbitrary `Value`s, stored as an
//! order-preserving pair list (float-bearing keys rule out a hash map, and
//! the wire format is an ordered pair list anyway).
//!
//! Floats are carried as raw IEEE-754 bit patterns: NaN and the infinities
//! survive a round trip bit-exactly, and equality compares bits, not numeric
//! value.

use bytes::{Buf, BufMut};

use crate::errors::{CodecError, Result};

/// Maximum byte length of a STRING or BYTE_ARRAY value (u16 length prefix).
pub const MAX_CHUNK_LEN: usize = u16::MAX as usize;

/// Maximum dictionary nesting accepted on decode.
///
/// The wire format itself is unbounded; the cap keeps hostile input from
/// recursing the parser off the stack.
pub const MAX_DICT_DEPTH: usize = 16;

/// Wire data types (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    /// 1 byte, 0 = false, nonzero = true
    Bool = 0x01,
    /// u8
    Byte = 0x02,
    /// i16 LE
    Short = 0x03,
    /// u16 LE
    UShort = 0x04,
    /// i32 LE
    Int = 0x05,
    /// u32 LE
    UInt = 0x06,
    /// i64 LE
    Long = 0x07,
    /// IEEE-754 binary32 LE
    Float = 0x08,
    /// IEEE-754 binary64 LE
    Double = 0x09,
    /// u16 LE byte count + UTF-8 bytes
    Str = 0x0A,
    /// 2x FLOAT
    Vector2 = 0x0B,
    /// 3x FLOAT
    Vector3 = 0x0C,
    /// 4x FLOAT
    Quaternion = 0x0D,
    /// u16 LE byte count + raw bytes
    ByteArray = 0x0E,
    /// u16 LE pair count + repeated (keyType, key, valType, val)
    Dictionary = 0x0F,
}

impl DataType {
    /// Look up a data type from its wire byte. `None` if outside the table.
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Bool),
            0x02 => Some(Self::Byte),
            0x03 => Some(Self::Short),
            0x04 => Some(Self::UShort),
            0x05 => Some(Self::Int),
            0x06 => Some(Self::UInt),
            0x07 => Some(Self::Long),
            0x08 => Some(Self::Float),
            0x09 => Some(Self::Double),
            0x0A => Some(Self::Str),
            0x0B => Some(Self::Vector2),
            0x0C => Some(Self::Vector3),
            0x0D => Some(Self::Quaternion),
            0x0E => Some(Self::ByteArray),
            0x0F => Some(Self::Dictionary),
            _ => None,
        }
    }

    /// Wire byte for this data type.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = CodecError;

    /// Encode-side lookup: a byte with no wire form is `UnsupportedType`.
    fn try_from(byte: u8) -> Result<Self> {
        Self::from_u8(byte).ok_or(CodecError::UnsupportedType(byte))
    }
}

/// One typed parameter value.
#[derive(Debug, Clone)]
pub enum Value {
    /// BOOL
    Bool(bool),
    /// BYTE
    Byte(u8),
    /// SHORT
    Short(i16),
    /// USHORT
    UShort(u16),
    /// INT
    Int(i32),
    /// UINT
    UInt(u32),
    /// LONG
    Long(i64),
    /// FLOAT
    Float(f32),
    /// DOUBLE
    Double(f64),
    /// STRING
    Str(String),
    /// VECTOR2
    Vector2([f32; 2]),
    /// VECTOR3
    Vector3([f32; 3]),
    /// QUATERNION
    Quaternion([f32; 4]),
    /// BYTE_ARRAY
    Bytes(Vec<u8>),
    /// DICTIONARY (ordered pairs, keys and values recurse)
    Dict(Vec<(Value, Value)>),
}

impl Value {
    /// Wire data type of this value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Byte(_) => DataType::Byte,
            Self::Short(_) => DataType::Short,
            Self::UShort(_) => DataType::UShort,
            Self::Int(_) => DataType::Int,
            Self::UInt(_) => DataType::UInt,
            Self::Long(_) => DataType::Long,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Str(_) => DataType::Str,
            Self::Vector2(_) => DataType::Vector2,
            Self::Vector3(_) => DataType::Vector3,
            Self::Quaternion(_) => DataType::Quaternion,
            Self::Bytes(_) => DataType::ByteArray,
            Self::Dict(_) => DataType::Dictionary,
        }
    }

    /// Serialize the value body (without the type byte) into `dst`.
    pub fn encode_into(&self, dst: &mut impl BufMut) -> Result<()> {
        match self {
            Self::Bool(v) => dst.put_u8(u8::from(*v)),
            Self::Byte(v) => dst.put_u8(*v),
            Self::Short(v) => dst.put_i16_le(*v),
            Self::UShort(v) => dst.put_u16_le(*v),
            Self::Int(v) => dst.put_i32_le(*v),
            Self::UInt(v) => dst.put_u32_le(*v),
            Self::Long(v) => dst.put_i64_le(*v),
            Self::Float(v) => dst.put_u32_le(v.to_bits()),
            Self::Double(v) => dst.put_u64_le(v.to_bits()),
            Self::Str(s) => {
                let len = checked_chunk_len(s.len(), "STRING")?;
                dst.put_u16_le(len);
                dst.put_slice(s.as_bytes());
            },
            Self::Vector2(v) => {
                for component in v {
                    dst.put_u32_le(component.to_bits());
                }
            },
            Self::Vector3(v) => {
                for component in v {
                    dst.put_u32_le(component.to_bits());
                }
            },
            Self::Quaternion(v) => {
                for component in v {
                    dst.put_u32_le(component.to_bits());
                }
            },
            Self::Bytes(b) => {
                let len = checked_chunk_len(b.len(), "BYTE_ARRAY")?;
                dst.put_u16_le(len);
                dst.put_slice(b);
            },
            Self::Dict(pairs) => {
                let count = checked_chunk_len(pairs.len(), "DICTIONARY pair count")?;
                dst.put_u16_le(count);
                for (key, val) in pairs {
                    dst.put_u8(key.data_type().to_u8());
                    key.encode_into(dst)?;
                    dst.put_u8(val.data_type().to_u8());
                    val.encode_into(dst)?;
                }
            },
        }
        Ok(())
    }

    /// Parse one value body of type `data_type` from the front of `src`.
    pub fn decode_from(data_type: DataType, src: &mut &[u8]) -> Result<Self> {
        Self::decode_at_depth(data_type, src, 0)
    }

    fn decode_at_depth(data_type: DataType, src: &mut &[u8], depth: usize) -> Result<Self> {
        let value = match data_type {
            DataType::Bool => Self::Bool(take(src, 1)?[0] != 0),
            DataType::Byte => {
                need(src, 1)?;
                Self::Byte(src.get_u8())
            },
            DataType::Short => {
                need(src, 2)?;
                Self::Short(src.get_i16_le())
            },
            DataType::UShort => {
                need(src, 2)?;
                Self::UShort(src.get_u16_le())
            },
            DataType::Int => {
                need(src, 4)?;
                Self::Int(src.get_i32_le())
            },
            DataType::UInt => {
                need(src, 4)?;
                Self::UInt(src.get_u32_le())
            },
            DataType::Long => {
                need(src, 8)?;
                Self::Long(src.get_i64_le())
            },
            DataType::Float => {
                need(src, 4)?;
                Self::Float(f32::from_bits(src.get_u32_le()))
            },
            DataType::Double => {
                need(src, 8)?;
                Self::Double(f64::from_bits(src.get_u64_le()))
            },
            DataType::Str => {
                need(src, 2)?;
                let len = src.get_u16_le() as usize;
                let raw = take(src, len)?;
                Self::Str(String::from_utf8(raw.to_vec()).map_err(|_| CodecError::BadString)?)
            },
            DataType::Vector2 => {
                need(src, 8)?;
                Self::Vector2([
                    f32::from_bits(src.get_u32_le()),
                    f32::from_bits(src.get_u32_le()),
                ])
            },
            DataType::Vector3 => {
                need(src, 12)?;
                Self::Vector3([
                    f32::from_bits(src.get_u32_le()),
                    f32::from_bits(src.get_u32_le()),
                    f32::from_bits(src.get_u32_le()),
                ])
            },
            DataType::Quaternion => {
                need(src, 16)?;
                Self::Quaternion([
                    f32::from_bits(src.get_u32_le()),
                    f32::from_bits(src.get_u32_le()),
                    f32::from_bits(src.get_u32_le()),
                    f32::from_bits(src.get_u32_le()),
                ])
            },
            DataType::ByteArray => {
                need(src, 2)?;
                let len = src.get_u16_le() as usize;
                Self::Bytes(take(src, len)?.to_vec())
            },
            DataType::Dictionary => {
                if depth >= MAX_DICT_DEPTH {
                    return Err(CodecError::ValueOutOfRange(format!(
                        "dictionary nesting exceeds {MAX_DICT_DEPTH} levels"
                    )));
                }
                need(src, 2)?;
                let count = src.get_u16_le() as usize;
                let mut pairs = Vec::with_capacity(count.min(256));
                for _ in 0..count {
                    let key_type = decode_type_byte(src)?;
                    let key = Self::decode_at_depth(key_type, src, depth + 1)?;
                    let val_type = decode_type_byte(src)?;
                    let val = Self::decode_at_depth(val_type, src, depth + 1)?;
                    pairs.push((key, val));
                }
                Self::Dict(pairs)
            },
        };

        Ok(value)
    }

    /// Convert into an explicitly requested wire type.
    ///
    /// This is the checked write path: integers convert across integer types
    /// when the value fits, integers widen into FLOAT/DOUBLE, FLOAT widens
    /// into DOUBLE. Everything else must already be the requested type.
    ///
    /// # Errors
    ///
    /// `CodecError::ValueOutOfRange` when the value cannot be represented in
    /// `target` (a negative number into UINT, a string into INT, ...).
    pub fn coerce(self, target: DataType) -> Result<Self> {
        if self.data_type() == target {
            return Ok(self);
        }

        let out_of_range = |value: &Self| {
            CodecError::ValueOutOfRange(format!("cannot represent {value:?} as {target:?}"))
        };

        if let Some(n) = self.integer_value() {
            let coerced = match target {
                DataType::Byte => u8::try_from(n).ok().map(Self::Byte),
                DataType::Short => i16::try_from(n).ok().map(Self::Short),
                DataType::UShort => u16::try_from(n).ok().map(Self::UShort),
                DataType::Int => i32::try_from(n).ok().map(Self::Int),
                DataType::UInt => u32::try_from(n).ok().map(Self::UInt),
                DataType::Long => Some(Self::Long(n)),
                DataType::Float => Some(Self::Float(n as f32)),
                DataType::Double => Some(Self::Double(n as f64)),
                _ => None,
            };
            return coerced.ok_or_else(|| out_of_range(&self));
        }

        match (&self, target) {
            (Self::Float(v), DataType::Double) => Ok(Self::Double(f64::from(*v))),
            _ => Err(out_of_range(&self)),
        }
    }

    /// The value as `i64` if it is any integer variant.
    #[must_use]
    pub fn integer_value(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::UShort(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::UInt(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as `u32` if it is a non-negative integer that fits.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        self.integer_value().and_then(|n| u32::try_from(n).ok())
    }

    /// The value as `bool` if it is BOOL.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as `&str` if it is STRING.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as raw bytes if it is BYTE_ARRAY.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The value as dictionary pairs if it is DICTIONARY.
    #[must_use]
    pub fn as_dict(&self) -> Option<&[(Self, Self)]> {
        match self {
            Self::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }
}

fn decode_type_byte(src: &mut &[u8]) -> Result<DataType> {
    need(src, 1)?;
    let byte = src.get_u8();
    DataType::from_u8(byte).ok_or(CodecError::UnknownType(byte))
}

fn need(src: &&[u8], len: usize) -> Result<()> {
    if src.len() < len {
        Err(CodecError::Truncated { expected: len, actual: src.len() })
    } else {
        Ok(())
    }
}

fn take<'a>(src: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    need(src, len)?;
    let (head, tail) = src.split_at(len);
    *src = tail;
    Ok(head)
}

fn checked_chunk_len(len: usize, what: &str) -> Result<u16> {
    u16::try_from(len)
        .map_err(|_| CodecError::ValueOutOfRange(format!("{what} of {len} exceeds {MAX_CHUNK_LEN}")))
}

// Equality compares float components by bit pattern so NaN payloads are
// stable under round trips.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::UShort(a), Self::UShort(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Vector2(a), Self::Vector2(b)) => float_bits_eq(a, b),
            (Self::Vector3(a), Self::Vector3(b)) => float_bits_eq(a, b),
            (Self::Quaternion(a), Self::Quaternion(b)) => float_bits_eq(a, b),
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

fn float_bits_eq(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

// Shape-inferred construction: the dictionary-writer path of the protocol
// picks types from value shape, which in Rust is the `From` impl chosen at
// the call site.
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::UShort(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<[f32; 2]> for Value {
    fn from(v: [f32; 2]) -> Self {
        Self::Vector2(v)
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Self::Vector3(v)
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Self::Quaternion(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(v: Vec<(Value, Value)>) -> Self {
        Self::Dict(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &Value) -> Value {
        let mut buf = Vec::new();
        value.encode_into(&mut buf).unwrap();
        let mut src = buf.as_slice();
        let decoded = Value::decode_from(value.data_type(), &mut src).unwrap();
        assert!(src.is_empty(), "decoder left {} trailing bytes", src.len());
        decoded
    }

    #[test]
    fn scalar_round_trips() {
        for value in [
            Value::Bool(true),
            Value::Bool(false),
            Value::Byte(0xFF),
            Value::Short(-12345),
            Value::UShort(54321),
            Value::Int(-2_000_000_000),
            Value::UInt(4_000_000_000),
            Value::Long(i64::MIN),
            Value::Float(10.5),
            Value::Double(-3.25e300),
        ] {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn nan_and_infinity_round_trip_bit_exact() {
        let quiet_nan = f32::from_bits(0x7FC0_0001);
        for value in [
            Value::Float(quiet_nan),
            Value::Float(f32::INFINITY),
            Value::Double(f64::NEG_INFINITY),
            Value::Vector3([f32::NAN, 0.0, -0.0]),
        ] {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn string_round_trips_utf8() {
        let value = Value::Str("Game \u{1F3AE}".to_string());
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn invalid_utf8_is_bad_string() {
        // STRING of length 2 with an invalid sequence
        let buf = [0x02, 0x00, 0xC3, 0x28];
        let mut src = &buf[..];
        let err = Value::decode_from(DataType::Str, &mut src).unwrap_err();
        assert_eq!(err, CodecError::BadString);
    }

    #[test]
    fn vector_wire_form_is_packed_floats() {
        let mut buf = Vec::new();
        Value::Vector3([10.5, 0.0, -3.2]).encode_into(&mut buf).unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[0..4], &10.5f32.to_le_bytes());
    }

    #[test]
    fn dictionary_round_trips_with_mixed_types() {
        let value = Value::Dict(vec![
            (Value::Str("hp".into()), Value::Int(100)),
            (Value::Byte(7), Value::Vector2([1.0, 2.0])),
            (
                Value::Str("nested".into()),
                Value::Dict(vec![(Value::Bool(true), Value::Bytes(vec![1, 2, 3]))]),
            ),
        ]);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn dictionary_depth_cap_rejects_runaway_nesting() {
        // Hand-built dictionary nested one past the cap: each level is a
        // single pair {BYTE 0 => DICTIONARY ...}, innermost empty.
        let mut buf = vec![0x00, 0x00];
        for _ in 0..MAX_DICT_DEPTH {
            let mut outer = vec![0x01, 0x00, 0x02, 0x00, 0x0F];
            outer.extend_from_slice(&buf);
            buf = outer;
        }
        let mut src = buf.as_slice();
        let err = Value::decode_from(DataType::Dictionary, &mut src).unwrap_err();
        assert!(matches!(err, CodecError::ValueOutOfRange(_)));
    }

    #[test]
    fn truncated_value_reports_expected_and_actual() {
        let buf = [0x42, 0x00];
        let mut src = &buf[..];
        let err = Value::decode_from(DataType::Int, &mut src).unwrap_err();
        assert_eq!(err, CodecError::Truncated { expected: 4, actual: 2 });
    }

    #[test]
    fn oversized_string_fails_encode() {
        let value = Value::Str("x".repeat(MAX_CHUNK_LEN + 1));
        let mut buf = Vec::new();
        assert!(matches!(value.encode_into(&mut buf), Err(CodecError::ValueOutOfRange(_))));
    }

    #[test]
    fn coerce_integer_widening_and_narrowing() {
        assert_eq!(Value::Int(66).coerce(DataType::UInt).unwrap(), Value::UInt(66));
        assert_eq!(Value::Byte(7).coerce(DataType::Long).unwrap(), Value::Long(7));
        assert_eq!(Value::UShort(300).coerce(DataType::Byte).unwrap_err(),
            CodecError::ValueOutOfRange("cannot represent UShort(300) as Byte".to_string()));
    }

    #[test]
    fn coerce_rejects_negative_into_unsigned() {
        let err = Value::Int(-1).coerce(DataType::UInt).unwrap_err();
        assert!(matches!(err, CodecError::ValueOutOfRange(_)));
    }

    #[test]
    fn coerce_rejects_shape_mismatch() {
        let err = Value::Str("Game".into()).coerce(DataType::Int).unwrap_err();
        assert!(matches!(err, CodecError::ValueOutOfRange(_)));
    }

    #[test]
    fn unknown_type_byte_in_dictionary() {
        // One pair whose key type byte is 0x99
        let buf = [0x01, 0x00, 0x99];
        let mut src = &buf[..];
        let err = Value::decode_from(DataType::Dictionary, &mut src).unwrap_err();
        assert_eq!(err, CodecError::UnknownType(0x99));
    }
}
