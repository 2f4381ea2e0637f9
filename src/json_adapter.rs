//! Serde interop: moves values between [`JsonValue`] and any serde data
//! format, `serde_json::Value` in particular.
//!
//! Type mapping into the value model:
//!   object  → Object (duplicate keys rejected with ERR_DUP_KEY)
//!   array   → Array
//!   string  → String
//!   boolean → Boolean
//!   number  → Int / Long / Double, by the same rule the text parser uses
//!   null    → absent (`None`)
//!
//! With serde_json's `arbitrary_precision` feature, numbers reach the
//! visitor as a one-entry map keyed by "$serde_json::private::Number" whose
//! value is the raw token.  Classifying that token instead of a lossy
//! `f64`/`i64` keeps "5.0" a Double and "5" an Int, exactly like the native
//! parser.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

use crate::decode::number_from_token;
use crate::errors::*;
use crate::value::{JsonArray, JsonKey, JsonObject, JsonValue};

// Magic key serde_json uses to pass raw number tokens through serde when
// arbitrary_precision is enabled.
const SERDE_JSON_NUMBER_KEY: &str = "$serde_json::private::Number";

// Prefix marking a duplicate-key failure so it can be mapped back to
// ERR_DUP_KEY after serde has wrapped it.
const DUP_KEY_PREFIX: &str = "duplicate key ";

// ── Deserialize ──────────────────────────────────────────────

struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any non-null JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<JsonValue, E> {
        Ok(JsonValue::Boolean(v))
    }

    // Without arbitrary_precision (or from non-JSON formats) numbers arrive
    // already typed.
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonValue, E> {
        Ok(match i32::try_from(v) {
            Ok(i) => JsonValue::Int(i),
            Err(_) => JsonValue::Long(v),
        })
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonValue, E> {
        match i64::try_from(v) {
            Ok(i) => self.visit_i64(i),
            Err(_) => Ok(JsonValue::Double(v as f64)),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonValue, E> {
        Ok(JsonValue::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<JsonValue, A::Error> {
        let mut items = JsonArray::new();
        while let Some(item) = seq.next_element::<Option<JsonValue>>()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JsonValue, A::Error> {
        let first_key: Option<String> = map.next_key()?;

        match first_key {
            Some(ref key) if key == SERDE_JSON_NUMBER_KEY => {
                let raw: String = map.next_value()?;
                number_from_token(&raw)
                    .ok_or_else(|| de::Error::custom(format!("invalid number token {}", raw)))
            }
            Some(first_key) => {
                let mut entries = JsonObject::new();
                let first_value: Option<JsonValue> = map.next_value()?;
                entries.insert(first_key.into(), first_value);

                while let Some(key) = map.next_key::<String>()? {
                    let value: Option<JsonValue> = map.next_value()?;
                    if entries.contains_key(&JsonKey::from(key.as_str())) {
                        return Err(de::Error::custom(format!("{}{:?}", DUP_KEY_PREFIX, key)));
                    }
                    entries.insert(key.into(), value);
                }
                Ok(JsonValue::Object(entries))
            }
            None => Ok(JsonValue::object()),
        }
    }
}

/// A bare `null` is not a `JsonValue`; deserialize `Option<JsonValue>` to
/// accept it.
impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

// ── Serialize ────────────────────────────────────────────────

/// `Unknown` serializes as unit (null).  Keys use their text projection.
impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonValue::Unknown => serializer.serialize_unit(),
            JsonValue::Boolean(b) => serializer.serialize_bool(*b),
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Int(i) => serializer.serialize_i32(*i),
            JsonValue::Long(l) => serializer.serialize_i64(*l),
            JsonValue::Double(d) => serializer.serialize_f64(*d),
            JsonValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            JsonValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(&key.to_string(), value)?;
                }
                map.end()
            }
        }
    }
}

// ── serde_json::Value bridge ─────────────────────────────────

fn map_serde_error(err: serde_json::Error) -> JsonError {
    let message = err.to_string();
    if message.starts_with(DUP_KEY_PREFIX) {
        JsonError::new(ERR_DUP_KEY, message)
    } else {
        JsonError::new(ERR_FORMAT, message)
    }
}

/// Convert a `serde_json::Value`.  JSON `null` becomes `None`.
pub fn from_serde_value(value: serde_json::Value) -> Result<Option<JsonValue>, JsonError> {
    Option::<JsonValue>::deserialize(value).map_err(map_serde_error)
}

/// Convert to a `serde_json::Value`.  Absent values and `Unknown` become
/// `Null`; non-finite doubles become `Null` as well.
pub fn to_serde_value(value: Option<&JsonValue>) -> Result<serde_json::Value, JsonError> {
    serde_json::to_value(value).map_err(map_serde_error)
}

/// Parse text with serde_json instead of the native parser.
pub fn from_serde_str(text: &str) -> Result<Option<JsonValue>, JsonError> {
    serde_json::from_str::<Option<JsonValue>>(text).map_err(map_serde_error)
}
