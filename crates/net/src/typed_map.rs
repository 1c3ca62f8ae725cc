//! Typed parameter maps.
//!
//! A [`TypedMap`] is a string-keyed bag of self-describing values. Each entry is
//! encoded with a one-byte type tag so a receiver can decode the map without
//! knowing which command it belongs to. Handlers read entries back through a
//! statically typed [`Key`].

use crate::buffer::{check_count, check_string_len, PacketReader, PacketWriter, WireError};
use blockcmd_core::BlockPos;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::marker::PhantomData;

/// Maximum number of entries in a single map.
pub const MAX_PARAMETERS: usize = 256;

/// Maximum number of strings in a [`TypedValue::StringList`].
pub const MAX_LIST_LEN: usize = 4096;

/// Wire type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    /// UTF-8 string.
    String = 0,
    /// 32-bit signed integer.
    Int = 1,
    /// Block position.
    Pos = 2,
    /// Boolean.
    Bool = 3,
    /// 64-bit float.
    Double = 4,
    /// 64-bit signed integer.
    Long = 5,
    /// List of strings.
    StringList = 6,
}

impl TryFrom<u8> for ValueKind {
    type Error = WireError;

    fn try_from(tag: u8) -> Result<Self, WireError> {
        match tag {
            0 => Ok(ValueKind::String),
            1 => Ok(ValueKind::Int),
            2 => Ok(ValueKind::Pos),
            3 => Ok(ValueKind::Bool),
            4 => Ok(ValueKind::Double),
            5 => Ok(ValueKind::Long),
            6 => Ok(ValueKind::StringList),
            other => Err(WireError::UnknownValueTag(other)),
        }
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    /// UTF-8 string.
    String(String),
    /// 32-bit signed integer.
    Int(i32),
    /// Block position.
    Pos(BlockPos),
    /// Boolean.
    Bool(bool),
    /// 64-bit float.
    Double(f64),
    /// 64-bit signed integer.
    Long(i64),
    /// List of strings.
    StringList(Vec<String>),
}

impl TypedValue {
    /// Wire type of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::String(_) => ValueKind::String,
            TypedValue::Int(_) => ValueKind::Int,
            TypedValue::Pos(_) => ValueKind::Pos,
            TypedValue::Bool(_) => ValueKind::Bool,
            TypedValue::Double(_) => ValueKind::Double,
            TypedValue::Long(_) => ValueKind::Long,
            TypedValue::StringList(_) => ValueKind::StringList,
        }
    }

    /// Check the value against the limits a reader enforces.
    pub fn verify(&self) -> Result<(), WireError> {
        match self {
            TypedValue::String(s) => check_string_len(s.len()),
            TypedValue::StringList(list) => {
                check_count("string list", list.len(), MAX_LIST_LEN)?;
                list.iter().try_for_each(|s| check_string_len(s.len()))
            }
            _ => Ok(()),
        }
    }

    fn encode(&self, w: &mut PacketWriter) {
        w.write_u8(self.kind() as u8);
        match self {
            TypedValue::String(s) => w.write_string(s),
            TypedValue::Int(v) => w.write_i32(*v),
            TypedValue::Pos(p) => w.write_pos(*p),
            TypedValue::Bool(b) => w.write_bool(*b),
            TypedValue::Double(d) => w.write_f64(*d),
            TypedValue::Long(l) => w.write_i64(*l),
            TypedValue::StringList(list) => {
                w.write_len(list.len());
                for s in list {
                    w.write_string(s);
                }
            }
        }
    }

    fn decode(r: &mut PacketReader<'_>) -> Result<Self, WireError> {
        let kind = ValueKind::try_from(r.read_u8()?)?;
        let value = match kind {
            ValueKind::String => TypedValue::String(r.read_string()?),
            ValueKind::Int => TypedValue::Int(r.read_i32()?),
            ValueKind::Pos => TypedValue::Pos(r.read_pos()?),
            ValueKind::Bool => TypedValue::Bool(r.read_bool()?),
            ValueKind::Double => TypedValue::Double(r.read_f64()?),
            ValueKind::Long => TypedValue::Long(r.read_i64()?),
            ValueKind::StringList => {
                let len = r.read_len("string list", MAX_LIST_LEN)?;
                let mut list = Vec::with_capacity(len);
                for _ in 0..len {
                    list.push(r.read_string()?);
                }
                TypedValue::StringList(list)
            }
        };
        Ok(value)
    }
}

/// Rust types that can be stored in a [`TypedMap`].
pub trait ParamType: Sized {
    /// Wire type used for this Rust type.
    const KIND: ValueKind;

    /// Wrap `self` in a [`TypedValue`].
    fn into_value(self) -> TypedValue;

    /// Extract a value of this type, or `None` on a type mismatch.
    fn from_value(value: &TypedValue) -> Option<Self>;
}

macro_rules! param_type {
    ($ty:ty, $variant:ident) => {
        impl ParamType for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> TypedValue {
                TypedValue::$variant(self)
            }

            fn from_value(value: &TypedValue) -> Option<Self> {
                match value {
                    TypedValue::$variant(v) => Some(v.to_owned()),
                    _ => None,
                }
            }
        }
    };
}

param_type!(String, String);
param_type!(i32, Int);
param_type!(BlockPos, Pos);
param_type!(bool, Bool);
param_type!(f64, Double);
param_type!(i64, Long);
param_type!(Vec<String>, StringList);

/// Statically typed name of a map entry.
///
/// ```
/// use blockcmd_net::{Key, TypedMap};
///
/// const PAGE: Key<i32> = Key::new("page");
/// let params = TypedMap::new().with(&PAGE, 2);
/// assert_eq!(params.get(&PAGE), Some(2));
/// ```
pub struct Key<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Declare a key.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    /// Entry name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T: ParamType> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?}: {:?})", self.name, T::KIND)
    }
}

/// Ordered, string-keyed map of typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedMap {
    entries: BTreeMap<String, TypedValue>,
}

impl TypedMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with<T: ParamType>(mut self, key: &Key<T>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a typed value, returning the previous value under that name.
    pub fn insert<T: ParamType>(&mut self, key: &Key<T>, value: T) -> Option<TypedValue> {
        self.entries.insert(key.name.to_owned(), value.into_value())
    }

    /// Insert an already wrapped value under a dynamic name.
    pub fn insert_raw(&mut self, name: impl Into<String>, value: TypedValue) -> Option<TypedValue> {
        self.entries.insert(name.into(), value)
    }

    /// Typed lookup; `None` if absent or stored with a different type.
    pub fn get<T: ParamType>(&self, key: &Key<T>) -> Option<T> {
        self.entries.get(key.name).and_then(T::from_value)
    }

    /// Typed lookup with a fallback.
    pub fn get_or<T: ParamType>(&self, key: &Key<T>, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Untyped lookup by name.
    pub fn get_raw(&self, name: &str) -> Option<&TypedValue> {
        self.entries.get(name)
    }

    /// Whether an entry with this name exists (of any type).
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, TypedValue> {
        self.entries.iter()
    }

    /// Check the map against the limits [`TypedMap::decode`] enforces.
    pub fn verify(&self) -> Result<(), WireError> {
        check_count("parameter", self.entries.len(), MAX_PARAMETERS)?;
        for (name, value) in &self.entries {
            check_string_len(name.len())?;
            value.verify()?;
        }
        Ok(())
    }

    /// Append the map to a packet.
    pub fn encode(&self, w: &mut PacketWriter) {
        w.write_len(self.entries.len());
        for (name, value) in &self.entries {
            w.write_string(name);
            value.encode(w);
        }
    }

    /// Read a map previously written by [`TypedMap::encode`].
    pub fn decode(r: &mut PacketReader<'_>) -> Result<Self, WireError> {
        let count = r.read_len("parameter", MAX_PARAMETERS)?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let name = r.read_string()?;
            let value = TypedValue::decode(r)?;
            if entries.contains_key(&name) {
                return Err(WireError::DuplicateKey(name));
            }
            entries.insert(name, value);
        }
        Ok(Self { entries })
    }
}

impl<'a> IntoIterator for &'a TypedMap {
    type Item = (&'a String, &'a TypedValue);
    type IntoIter = btree_map::Iter<'a, String, TypedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MAX_STRING_LEN;

    const PAGE: Key<i32> = Key::new("page");
    const LABEL: Key<String> = Key::new("label");
    const ENABLED: Key<bool> = Key::new("enabled");

    fn roundtrip(map: &TypedMap) -> TypedMap {
        let mut w = PacketWriter::new();
        map.encode(&mut w);
        let mut r = PacketReader::new(w.as_bytes());
        let decoded = TypedMap::decode(&mut r).expect("decode");
        r.finish().expect("fully consumed");
        decoded
    }

    #[test]
    fn typed_get_respects_kind() {
        let map = TypedMap::new().with(&PAGE, 2).with(&LABEL, "north".into());
        assert_eq!(map.get(&PAGE), Some(2));
        assert_eq!(map.get(&LABEL).as_deref(), Some("north"));

        let wrong: Key<bool> = Key::new("page");
        assert_eq!(map.get(&wrong), None);
        assert!(!map.get_or(&ENABLED, false));
    }

    #[test]
    fn every_kind_survives_the_wire() {
        let mut map = TypedMap::new();
        map.insert_raw("s", TypedValue::String("x".into()));
        map.insert_raw("i", TypedValue::Int(-5));
        map.insert_raw("p", TypedValue::Pos(BlockPos::new(1, 2, 3)));
        map.insert_raw("b", TypedValue::Bool(true));
        map.insert_raw("d", TypedValue::Double(0.25));
        map.insert_raw("l", TypedValue::Long(i64::MIN));
        map.insert_raw("sl", TypedValue::StringList(vec!["a".into(), "".into()]));
        assert_eq!(roundtrip(&map), map);
    }

    #[test]
    fn entries_are_written_in_key_order() {
        let mut map = TypedMap::new();
        map.insert_raw("b", TypedValue::Int(1));
        map.insert_raw("a", TypedValue::Int(2));
        let names: Vec<_> = map.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let mut w = PacketWriter::new();
        map.encode(&mut w);
        // count, then the first key "a"
        assert_eq!(&w.as_bytes()[..9], &[0, 0, 0, 2, 0, 0, 0, 1, b'a']);
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut w = PacketWriter::new();
        w.write_i32(1);
        w.write_string("k");
        w.write_u8(42);
        let mut r = PacketReader::new(w.as_bytes());
        assert_eq!(TypedMap::decode(&mut r), Err(WireError::UnknownValueTag(42)));
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut w = PacketWriter::new();
        w.write_i32(2);
        for _ in 0..2 {
            w.write_string("k");
            w.write_u8(ValueKind::Int as u8);
            w.write_i32(1);
        }
        let mut r = PacketReader::new(w.as_bytes());
        assert_eq!(
            TypedMap::decode(&mut r),
            Err(WireError::DuplicateKey("k".into()))
        );
    }

    #[test]
    fn excessive_count_rejected() {
        let mut w = PacketWriter::new();
        w.write_len(MAX_PARAMETERS + 1);
        let mut r = PacketReader::new(w.as_bytes());
        assert!(matches!(
            TypedMap::decode(&mut r),
            Err(WireError::TooMany { what: "parameter", .. })
        ));
    }

    #[test]
    fn json_form_is_tagged() {
        let map = TypedMap::new().with(&PAGE, 2);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"page":{"type":"int","value":2}}"#);
        let back: TypedMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn verify_matches_decoder_parameter_limit() {
        let mut map = TypedMap::new();
        for i in 0..=MAX_PARAMETERS {
            map.insert_raw(format!("p{i}"), TypedValue::Int(1));
        }
        let too_many = WireError::TooMany {
            what: "parameter",
            count: MAX_PARAMETERS + 1,
            max: MAX_PARAMETERS,
        };
        assert_eq!(map.verify(), Err(too_many.clone()));

        let mut w = PacketWriter::new();
        map.encode(&mut w);
        assert_eq!(
            TypedMap::decode(&mut PacketReader::new(w.as_bytes())),
            Err(too_many)
        );
    }

    #[test]
    fn verify_rejects_oversized_keys_and_strings() {
        let long = "x".repeat(MAX_STRING_LEN + 1);
        let too_long = Err(WireError::StringTooLong {
            len: MAX_STRING_LEN + 1,
            max: MAX_STRING_LEN,
        });

        let key = TypedMap::new().with(&Key::<i32>::new("ok"), 1);
        let mut bad_key = key.clone();
        bad_key.insert_raw(long.clone(), TypedValue::Int(1));
        assert_eq!(key.verify(), Ok(()));
        assert_eq!(bad_key.verify(), too_long);

        let bad_value = TypedMap::new().with(&LABEL, long.clone());
        assert_eq!(bad_value.verify(), too_long);

        let bad_item = TypedMap::new().with(&Key::<Vec<String>>::new("lines"), vec![long]);
        assert_eq!(bad_item.verify(), too_long);
    }

    #[test]
    fn verify_rejects_long_string_lists() {
        let list = vec![String::new(); MAX_LIST_LEN + 1];
        let map = TypedMap::new().with(&Key::<Vec<String>>::new("lines"), list);
        assert!(matches!(
            map.verify(),
            Err(WireError::TooMany { what: "string list", .. })
        ));

        let fits = TypedMap::new().with(
            &Key::<Vec<String>>::new("lines"),
            vec![String::new(); MAX_LIST_LEN],
        );
        assert_eq!(fits.verify(), Ok(()));
    }
}
