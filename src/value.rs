//! Dynamically-typed JSON value.
//!
//! A [`JsonValue`] holds exactly one of eight variants.  A fresh value is
//! `Unknown`; the first mutating collection operation promotes it to `Object`
//! or `Array`, after which the variant is fixed for collection purposes.
//! Scalar setters replace the variant wholesale.
//!
//! JSON `null` is not a variant: it is the absence of a value, modelled as
//! `Option<JsonValue>::None`.  Container entries are therefore
//! `Option<JsonValue>` slots, and the parser returns `None` for a `null`
//! literal.
//!
//! Object keys are [`JsonKey`]s rather than plain strings so that native maps
//! keyed by integers or booleans can be represented without stringifying
//! early.  The text projection (`Display`) is applied only when writing.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::errors::*;

/// Insertion-ordered object storage.
pub type JsonObject = IndexMap<JsonKey, Option<JsonValue>>;

/// Array storage.  `None` entries are JSON nulls.
pub type JsonArray = Vec<Option<JsonValue>>;

/// Discriminant of a [`JsonValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Unknown,
    Object,
    Array,
    Boolean,
    String,
    Int,
    Long,
    Double,
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::Unknown => "unknown",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Boolean => "bool",
            JsonType::String => "string",
            JsonType::Int => "int",
            JsonType::Long => "long",
            JsonType::Double => "double",
        };
        f.write_str(name)
    }
}

// ── Keys ─────────────────────────────────────────────────────

/// An object key.
///
/// Parsed documents only ever produce `Str` keys.  The other variants appear
/// when the mapper exports native maps keyed by non-text types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum JsonKey {
    Str(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Char(char),
}

// Hash only the payload so a `Str` key hashes like its text.
impl Hash for JsonKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            JsonKey::Str(s) => s.hash(state),
            JsonKey::Int(i) => i.hash(state),
            JsonKey::UInt(u) => u.hash(state),
            JsonKey::Bool(b) => b.hash(state),
            JsonKey::Char(c) => c.hash(state),
        }
    }
}

impl JsonKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonKey::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar value with the same payload, used when a key is converted to
    /// a native type.
    pub fn to_value(&self) -> JsonValue {
        match self {
            JsonKey::Str(s) => JsonValue::String(s.clone()),
            JsonKey::Int(i) => JsonValue::from(*i),
            JsonKey::UInt(u) => match i64::try_from(*u) {
                Ok(i) => JsonValue::from(i),
                Err(_) => JsonValue::String(u.to_string()),
            },
            JsonKey::Bool(b) => JsonValue::Boolean(*b),
            JsonKey::Char(c) => JsonValue::String(c.to_string()),
        }
    }
}

/// Text projection used on the wire.
impl fmt::Display for JsonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonKey::Str(s) => f.write_str(s),
            JsonKey::Int(i) => write!(f, "{}", i),
            JsonKey::UInt(u) => write!(f, "{}", u),
            JsonKey::Bool(b) => write!(f, "{}", b),
            JsonKey::Char(c) => write!(f, "{}", c),
        }
    }
}

impl From<&str> for JsonKey {
    fn from(s: &str) -> Self {
        JsonKey::Str(s.to_owned())
    }
}

impl From<String> for JsonKey {
    fn from(s: String) -> Self {
        JsonKey::Str(s)
    }
}

impl From<&String> for JsonKey {
    fn from(s: &String) -> Self {
        JsonKey::Str(s.clone())
    }
}

impl From<i32> for JsonKey {
    fn from(i: i32) -> Self {
        JsonKey::Int(i64::from(i))
    }
}

impl From<i64> for JsonKey {
    fn from(i: i64) -> Self {
        JsonKey::Int(i)
    }
}

impl From<u64> for JsonKey {
    fn from(u: u64) -> Self {
        JsonKey::UInt(u)
    }
}

impl From<bool> for JsonKey {
    fn from(b: bool) -> Self {
        JsonKey::Bool(b)
    }
}

impl From<char> for JsonKey {
    fn from(c: char) -> Self {
        JsonKey::Char(c)
    }
}

// ── Values ───────────────────────────────────────────────────

/// A JSON document fragment.
#[derive(Debug, Clone, Default)]
pub enum JsonValue {
    /// No payload yet.  Promoted by the first collection mutation.
    #[default]
    Unknown,
    Object(JsonObject),
    Array(JsonArray),
    Boolean(bool),
    String(String),
    Int(i32),
    Long(i64),
    Double(f64),
}

/// Variant and payload must match.  `Unknown` equals nothing, itself
/// included, so `PartialEq` is deliberately not reflexive.
impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonValue::Object(a), JsonValue::Object(b)) => a == b,
            (JsonValue::Array(a), JsonValue::Array(b)) => a == b,
            (JsonValue::Boolean(a), JsonValue::Boolean(b)) => a == b,
            (JsonValue::String(a), JsonValue::String(b)) => a == b,
            (JsonValue::Int(a), JsonValue::Int(b)) => a == b,
            (JsonValue::Long(a), JsonValue::Long(b)) => a == b,
            (JsonValue::Double(a), JsonValue::Double(b)) => a == b,
            _ => false,
        }
    }
}

impl JsonValue {
    pub fn new() -> Self {
        JsonValue::Unknown
    }

    /// Empty, already-promoted object.
    pub fn object() -> Self {
        JsonValue::Object(JsonObject::new())
    }

    /// Empty, already-promoted array.
    pub fn array() -> Self {
        JsonValue::Array(JsonArray::new())
    }

    // ── Type queries ─────────────────────────────────────────

    pub fn json_type(&self) -> JsonType {
        match self {
            JsonValue::Unknown => JsonType::Unknown,
            JsonValue::Object(_) => JsonType::Object,
            JsonValue::Array(_) => JsonType::Array,
            JsonValue::Boolean(_) => JsonType::Boolean,
            JsonValue::String(_) => JsonType::String,
            JsonValue::Int(_) => JsonType::Int,
            JsonValue::Long(_) => JsonType::Long,
            JsonValue::Double(_) => JsonType::Double,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, JsonValue::Array(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JsonValue::Boolean(_))
    }

    /// True while the value is still `Unknown` (no payload assigned).
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Unknown)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsonValue::String(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, JsonValue::Int(_))
    }

    pub fn is_long(&self) -> bool {
        matches!(self, JsonValue::Long(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, JsonValue::Double(_))
    }

    // ── Scalar setters ───────────────────────────────────────

    pub fn set_bool(&mut self, value: bool) {
        *self = JsonValue::Boolean(value);
    }

    pub fn set_string(&mut self, value: impl Into<String>) {
        *self = JsonValue::String(value.into());
    }

    pub fn set_int(&mut self, value: i32) {
        *self = JsonValue::Int(value);
    }

    pub fn set_long(&mut self, value: i64) {
        *self = JsonValue::Long(value);
    }

    pub fn set_double(&mut self, value: f64) {
        *self = JsonValue::Double(value);
    }

    // ── Typed extraction ─────────────────────────────────────

    pub fn get_string(&self) -> Result<&str, JsonError> {
        match self {
            JsonValue::String(s) => Ok(s),
            other => Err(JsonError::type_mismatch("string", other.json_type())),
        }
    }

    pub fn get_bool(&self) -> Result<bool, JsonError> {
        match self {
            JsonValue::Boolean(b) => Ok(*b),
            other => Err(JsonError::type_mismatch("bool", other.json_type())),
        }
    }

    pub fn get_int(&self) -> Result<i32, JsonError> {
        match self {
            JsonValue::Int(i) => Ok(*i),
            other => Err(JsonError::type_mismatch("int", other.json_type())),
        }
    }

    pub fn get_long(&self) -> Result<i64, JsonError> {
        match self {
            JsonValue::Long(l) => Ok(*l),
            other => Err(JsonError::type_mismatch("long", other.json_type())),
        }
    }

    pub fn get_double(&self) -> Result<f64, JsonError> {
        match self {
            JsonValue::Double(d) => Ok(*d),
            other => Err(JsonError::type_mismatch("double", other.json_type())),
        }
    }

    // ── Collections ──────────────────────────────────────────

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&JsonArray> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Object storage, promoting `Unknown`.
    fn object_mut(&mut self) -> Result<&mut JsonObject, JsonError> {
        if let JsonValue::Unknown = self {
            *self = JsonValue::object();
        }
        match self {
            JsonValue::Object(map) => Ok(map),
            other => Err(JsonError::type_mismatch("object", other.json_type())),
        }
    }

    /// Array storage, promoting `Unknown`.
    fn array_mut(&mut self) -> Result<&mut JsonArray, JsonError> {
        if let JsonValue::Unknown = self {
            *self = JsonValue::array();
        }
        match self {
            JsonValue::Array(items) => Ok(items),
            other => Err(JsonError::type_mismatch("array", other.json_type())),
        }
    }

    /// Append to an array.  Returns the new element's position.
    pub fn push(&mut self, value: impl Into<Option<JsonValue>>) -> Result<usize, JsonError> {
        let items = self.array_mut()?;
        items.push(value.into());
        Ok(items.len() - 1)
    }

    /// Insert a new key into an object.  An existing key is `ERR_DUP_KEY`.
    pub fn insert(
        &mut self,
        key: impl Into<JsonKey>,
        value: impl Into<Option<JsonValue>>,
    ) -> Result<(), JsonError> {
        let key = key.into();
        let map = self.object_mut()?;
        if map.contains_key(&key) {
            return Err(JsonError::new(ERR_DUP_KEY, format!("duplicate key {:?}", key.to_string())));
        }
        map.insert(key, value.into());
        Ok(())
    }

    /// Assign a key, overwriting any previous value in place.  Returns the
    /// previous slot if the key existed.
    pub fn set_entry(
        &mut self,
        key: impl Into<JsonKey>,
        value: impl Into<Option<JsonValue>>,
    ) -> Result<Option<Option<JsonValue>>, JsonError> {
        let map = self.object_mut()?;
        Ok(map.insert(key.into(), value.into()))
    }

    /// Replace the element at `index`.
    pub fn set_index(
        &mut self,
        index: usize,
        value: impl Into<Option<JsonValue>>,
    ) -> Result<(), JsonError> {
        let items = self.array_mut()?;
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or_else(|| index_error(index, len))?;
        *slot = value.into();
        Ok(())
    }

    /// Value stored under `key`.  `Ok(None)` covers both a missing key and an
    /// explicit null.  An `Unknown` value reads as an empty object.
    pub fn get(&self, key: impl Into<JsonKey>) -> Result<Option<&JsonValue>, JsonError> {
        match self {
            JsonValue::Object(map) => Ok(map.get(&key.into()).and_then(Option::as_ref)),
            JsonValue::Unknown => Ok(None),
            other => Err(JsonError::type_mismatch("object", other.json_type())),
        }
    }

    /// Mutable access to the value under `key`, promoting `Unknown`.
    pub fn get_mut(&mut self, key: impl Into<JsonKey>) -> Result<Option<&mut JsonValue>, JsonError> {
        let map = self.object_mut()?;
        Ok(map.get_mut(&key.into()).and_then(Option::as_mut))
    }

    /// Element at `index`.  `Ok(None)` is a null element.
    pub fn at(&self, index: usize) -> Result<Option<&JsonValue>, JsonError> {
        match self {
            JsonValue::Array(items) => items
                .get(index)
                .map(Option::as_ref)
                .ok_or_else(|| index_error(index, items.len())),
            JsonValue::Unknown => Err(index_error(index, 0)),
            other => Err(JsonError::type_mismatch("array", other.json_type())),
        }
    }

    /// Mutable access to the element at `index`, promoting `Unknown`.
    pub fn at_mut(&mut self, index: usize) -> Result<Option<&mut JsonValue>, JsonError> {
        let items = self.array_mut()?;
        let len = items.len();
        items
            .get_mut(index)
            .map(Option::as_mut)
            .ok_or_else(|| index_error(index, len))
    }

    pub fn contains_key(&self, key: impl Into<JsonKey>) -> bool {
        match self {
            JsonValue::Object(map) => map.contains_key(&key.into()),
            _ => false,
        }
    }

    /// Number of entries in an object or elements in an array.
    pub fn count(&self) -> Result<usize, JsonError> {
        match self {
            JsonValue::Object(map) => Ok(map.len()),
            JsonValue::Array(items) => Ok(items.len()),
            other => Err(JsonError::type_mismatch("collection", other.json_type())),
        }
    }

    /// Object keys in insertion order.
    pub fn keys(&self) -> Result<impl Iterator<Item = &JsonKey> + '_, JsonError> {
        Ok(self.entries()?.map(|(k, _)| k))
    }

    /// Text projection of every key, in insertion order.
    pub fn string_keys(&self) -> Result<Vec<String>, JsonError> {
        Ok(self.keys()?.map(JsonKey::to_string).collect())
    }

    /// Object entries in insertion order.  `Unknown` yields nothing.
    pub fn entries(
        &self,
    ) -> Result<impl Iterator<Item = (&JsonKey, Option<&JsonValue>)> + '_, JsonError> {
        let map = match self {
            JsonValue::Object(map) => Some(map),
            JsonValue::Unknown => None,
            other => return Err(JsonError::type_mismatch("object", other.json_type())),
        };
        Ok(map
            .into_iter()
            .flat_map(|m| m.iter())
            .map(|(k, v)| (k, v.as_ref())))
    }

    /// Array elements in order.  `Unknown` yields nothing.
    pub fn elements(&self) -> Result<impl Iterator<Item = Option<&JsonValue>> + '_, JsonError> {
        let items = match self {
            JsonValue::Array(items) => Some(items),
            JsonValue::Unknown => None,
            other => return Err(JsonError::type_mismatch("array", other.json_type())),
        };
        Ok(items.into_iter().flat_map(|v| v.iter()).map(Option::as_ref))
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: impl Into<JsonKey>) -> Result<Option<Option<JsonValue>>, JsonError> {
        let map = self.object_mut()?;
        Ok(map.shift_remove(&key.into()))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Option<JsonValue>, JsonError> {
        let items = self.array_mut()?;
        if index >= items.len() {
            return Err(index_error(index, items.len()));
        }
        Ok(items.remove(index))
    }

    /// Empty a collection without changing its variant.  Scalars and
    /// `Unknown` are left alone.
    pub fn clear(&mut self) {
        match self {
            JsonValue::Object(map) => map.clear(),
            JsonValue::Array(items) => items.clear(),
            _ => {}
        }
    }
}

fn index_error(index: usize, len: usize) -> JsonError {
    JsonError::new(
        ERR_INDEX,
        format!("index {} out of range for length {}", index, len),
    )
}

// ── Conversions ──────────────────────────────────────────────

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        JsonValue::Boolean(v)
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        JsonValue::String(v.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        JsonValue::String(v)
    }
}

impl From<i32> for JsonValue {
    fn from(v: i32) -> Self {
        JsonValue::Int(v)
    }
}

/// Stored as `Long`, matching the value's declared width.
impl From<i64> for JsonValue {
    fn from(v: i64) -> Self {
        JsonValue::Long(v)
    }
}

impl From<f32> for JsonValue {
    fn from(v: f32) -> Self {
        JsonValue::Double(f64::from(v))
    }
}

impl From<f64> for JsonValue {
    fn from(v: f64) -> Self {
        JsonValue::Double(v)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonValue::Unknown => f.write_str("<unknown>"),
            JsonValue::Object(map) => write!(f, "{{{} entries}}", map.len()),
            JsonValue::Array(items) => write!(f, "[{} items]", items.len()),
            JsonValue::Boolean(b) => write!(f, "{}", b),
            JsonValue::String(s) => write!(f, "\"{}\"", s),
            JsonValue::Int(i) => write!(f, "{}", i),
            JsonValue::Long(l) => write!(f, "{}", l),
            JsonValue::Double(d) => write!(f, "{}", d),
        }
    }
}
