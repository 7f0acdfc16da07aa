//! Property-based tests for frame encoding/decoding.
//!
//! These verify the wire layer for ALL well-typed inputs, not just specific
//! examples: round-trip identity over every data type (including recursive
//! dictionaries and NaN float payloads), and rejection of any single-bit
//! corruption.

use archive_proto::{CodecError, Frame, MessageType, Params, Value};
use proptest::prelude::*;

/// Strategy for arbitrary message types
fn arbitrary_message_type() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::System),
        Just(MessageType::Reliable),
        Just(MessageType::Unreliable),
        Just(MessageType::Fragment),
        Just(MessageType::Ack),
        Just(MessageType::Ping),
        Just(MessageType::Room),
        Just(MessageType::Event),
    ]
}

/// Strategy for arbitrary typed values, recursing into dictionaries.
///
/// Floats are generated from raw bit patterns so NaN payloads and the
/// infinities are covered.
fn arbitrary_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<u8>().prop_map(Value::Byte),
        any::<i16>().prop_map(Value::Short),
        any::<u16>().prop_map(Value::UShort),
        any::<i32>().prop_map(Value::Int),
        any::<u32>().prop_map(Value::UInt),
        any::<i64>().prop_map(Value::Long),
        any::<u32>().prop_map(|bits| Value::Float(f32::from_bits(bits))),
        any::<u64>().prop_map(|bits| Value::Double(f64::from_bits(bits))),
        ".{0,16}".prop_map(Value::Str),
        prop::array::uniform2(any::<u32>()).prop_map(|b| Value::Vector2(b.map(f32::from_bits))),
        prop::array::uniform3(any::<u32>()).prop_map(|b| Value::Vector3(b.map(f32::from_bits))),
        prop::array::uniform4(any::<u32>()).prop_map(|b| Value::Quaternion(b.map(f32::from_bits))),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::vec((inner.clone(), inner), 0..4).prop_map(Value::Dict)
    })
}

/// Strategy for arbitrary frames with up to six parameters
fn arbitrary_frame() -> impl Strategy<Value = Frame> {
    (
        arbitrary_message_type(),
        any::<u8>(),
        prop::collection::vec((any::<u8>(), arbitrary_value()), 0..6),
    )
        .prop_map(|(message_type, op_code, entries)| {
            let mut params = Params::new();
            for (code, value) in entries {
                params.insert(code, value);
            }
            Frame::new(message_type, op_code, params)
        })
}

#[test]
fn prop_frame_encode_decode_roundtrip() {
    proptest!(|(frame in arbitrary_frame())| {
        let wire = frame.encode().expect("encode should succeed");

        // PROPERTY: Round-trip must be identity (paramCode view)
        let decoded = Frame::decode(&wire).expect("decode should succeed");
        prop_assert_eq!(decoded, frame);
    });
}

#[test]
fn prop_frame_length_is_payload_plus_six() {
    proptest!(|(frame in arbitrary_frame())| {
        let wire = frame.encode().expect("encode should succeed");
        let payload_len = u16::from_le_bytes([wire[2], wire[3]]) as usize;

        // PROPERTY: Total frame length equals payloadLength + 6
        prop_assert_eq!(wire.len(), payload_len + 6);
    });
}

#[test]
fn prop_single_bit_flip_is_rejected() {
    proptest!(|(frame in arbitrary_frame(), index in any::<prop::sample::Index>())| {
        let wire = frame.encode().expect("encode should succeed");
        let bit = index.index(wire.len() * 8);

        let mut corrupted = wire.to_vec();
        corrupted[bit / 8] ^= 1 << (bit % 8);

        // PROPERTY: Any single-bit corruption fails decode
        let result = Frame::decode(&corrupted);
        prop_assert!(result.is_err(), "corrupted frame decoded: bit {}", bit);

        // Outside the length field the failure must be the CRC check
        // (length-field flips fail the total-length validation first)
        if !(2..4).contains(&(bit / 8)) {
            let is_crc_err = matches!(result, Err(CodecError::Crc { .. }));
            prop_assert!(is_crc_err);
        }
    });
}

#[test]
fn prop_truncation_is_rejected() {
    proptest!(|(frame in arbitrary_frame(), index in any::<prop::sample::Index>())| {
        let wire = frame.encode().expect("encode should succeed");
        let keep = index.index(wire.len());

        // PROPERTY: Every strict prefix fails decode
        prop_assert!(Frame::decode(&wire[..keep]).is_err());
    });
}

#[test]
fn prop_decode_never_panics_on_garbage() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..256))| {
        // PROPERTY: Arbitrary input returns a Result, never panics
        let _ = Frame::decode(&bytes);
    });
}
