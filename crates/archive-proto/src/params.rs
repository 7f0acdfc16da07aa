//! Ordered parameter map.
//!
//! On the wire, parameters are an ordered sequence of (code, type, value)
//! triples. In memory they are a code-keyed map that remembers insertion
//! order for deterministic encoding. Values are stored once, by numeric
//! code; the canonical-name view consults the static [`ParamCode`] table on
//! read instead of duplicating entries.

use crate::{
    errors::Result,
    names::ParamCode,
    value::{DataType, Value},
};

/// Parameters of one frame, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    entries: Vec<(u8, Value)>,
}

impl Params {
    /// Create an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under `code`, replacing any existing entry in place.
    ///
    /// Replacement keeps the first-seen position so encode order stays
    /// deterministic. Duplicate codes on the wire are legal and collapse the
    /// same way on decode (last write wins).
    pub fn insert(&mut self, code: impl Into<u8>, value: impl Into<Value>) -> &mut Self {
        let code = code.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((code, value)),
        }
        self
    }

    /// Insert a value coerced into an explicitly requested wire type.
    ///
    /// # Errors
    ///
    /// `CodecError::ValueOutOfRange` when the value cannot be represented in
    /// `data_type`.
    pub fn insert_as(
        &mut self,
        code: impl Into<u8>,
        data_type: DataType,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let coerced = value.into().coerce(data_type)?;
        Ok(self.insert(code, coerced))
    }

    /// Value stored under `code`.
    #[must_use]
    pub fn get(&self, code: impl Into<u8>) -> Option<&Value> {
        let code = code.into();
        self.entries.iter().find(|(c, _)| *c == code).map(|(_, v)| v)
    }

    /// Value stored under the canonical name `name` (e.g. `"PLAYER_ID"`).
    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        ParamCode::from_name(name).and_then(|code| self.get(code))
    }

    /// Whether `code` is present.
    #[must_use]
    pub fn contains(&self, code: impl Into<u8>) -> bool {
        self.get(code).is_some()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Value)> {
        self.entries.iter().map(|(c, v)| (*c, v))
    }

    /// Number of distinct parameter codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (u8, &'a Value);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (u8, Value)>,
        fn(&'a (u8, Value)) -> (u8, &'a Value),
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn entry_ref(entry: &(u8, Value)) -> (u8, &Value) {
            (entry.0, &entry.1)
        }
        self.entries.iter().map(entry_ref as fn(&'a (u8, Value)) -> (u8, &'a Value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_by_code_and_name() {
        let mut params = Params::new();
        params.insert(ParamCode::PlayerId, 66i32);
        params.insert(ParamCode::RoomId, "Game");

        assert_eq!(params.get(ParamCode::PlayerId), Some(&Value::Int(66)));
        assert_eq!(params.get(0x01u8), Some(&Value::Int(66)));
        assert_eq!(params.get_named("ROOM_ID"), Some(&Value::Str("Game".into())));
        assert_eq!(params.get_named("HEALTH"), None);
        assert_eq!(params.get_named("NOT_A_NAME"), None);
    }

    #[test]
    fn duplicate_insert_is_last_write_wins_in_place() {
        let mut params = Params::new();
        params.insert(ParamCode::PlayerId, 1i32);
        params.insert(ParamCode::RoomId, "A");
        params.insert(ParamCode::PlayerId, 2i32);

        assert_eq!(params.len(), 2);
        let order: Vec<u8> = params.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec![0x01, 0x02]);
        assert_eq!(params.get(ParamCode::PlayerId), Some(&Value::Int(2)));
    }

    #[test]
    fn insert_as_coerces_or_fails() {
        let mut params = Params::new();
        params.insert_as(ParamCode::Sequence, DataType::UInt, 7i32).unwrap();
        assert_eq!(params.get(ParamCode::Sequence), Some(&Value::UInt(7)));

        let err = params.insert_as(ParamCode::Sequence, DataType::UInt, -7i32);
        assert!(err.is_err());
    }

    #[test]
    fn non_canonical_codes_are_storable() {
        let mut params = Params::new();
        params.insert(0xF0u8, Value::Bool(true));
        assert!(params.contains(0xF0u8));
        assert_eq!(params.get_named("PROPERTIES"), None);
    }
}
