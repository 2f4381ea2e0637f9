//! # easymap: dynamic JSON values and a registry-driven object mapper
//!
//! Three layers, each usable on its own:
//!
//! - [`JsonValue`], a dynamically-typed tree whose `Unknown` state promotes
//!   to an object or array on first collection use;
//! - a recursive-descent parser and an aligned, indenting serializer;
//! - a [`Mapper`] that converts native values to and from trees, with custom
//!   exporters, importers and factories registered per type.
//!
//! ```
//! use easymap::{to_json, to_json_data, JsonValue};
//!
//! let doc = to_json_data(r#"{"name": "p1", "ids": [1, 9999999999]}"#)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(doc.get("name").unwrap(), Some(&JsonValue::from("p1")));
//! assert!(doc.get("ids").unwrap().unwrap().at(1).unwrap().unwrap().is_long());
//!
//! let text = to_json(Some(&doc));
//! assert!(text.starts_with("{\n \"name\" : \"p1\",\n"));
//! ```
//!
//! JSON `null` is represented as absence (`Option::None`) throughout.

pub mod constants;
pub mod convert;
pub mod decode;
pub mod encode;
pub mod errors;
pub mod json_adapter;
pub mod mapper;
pub mod record;
pub mod registry;
pub mod value;

use std::io::{Read, Write};

pub use constants::TYPE_HASH_FIELD;
pub use encode::WriterOptions;
pub use errors::{
    JsonError, ParseError, ParseErrorKind, ERR_DUP_KEY, ERR_FORMAT, ERR_INDEX, ERR_IO,
    ERR_OVERFLOW, ERR_PARSE, ERR_TYPE_MISMATCH, ERR_UNSUPPORTED,
};
pub use json_adapter::{from_serde_str, from_serde_value, to_serde_value};
pub use mapper::{MapKey, Mappable, Mapper, MapperOptions, MissingFieldPolicy};
pub use record::{Field, Record, TypeMarkers};
pub use registry::{type_hash, Registry};
pub use value::{JsonArray, JsonKey, JsonObject, JsonType, JsonValue};

// ── Text → value ─────────────────────────────────────────────

/// Parse JSON text.  Empty or all-whitespace input is `Ok(None)`, as is a
/// document consisting of `null`.
pub fn to_json_data(text: &str) -> Result<Option<JsonValue>, ParseError> {
    decode::parse_str(text)
}

/// Parse encoded bytes: UTF-8, or UTF-16 when a byte-order mark says so.
pub fn to_json_data_from_slice(raw: &[u8]) -> Result<Option<JsonValue>, JsonError> {
    decode::parse_slice(raw)
}

/// Parse UTF-16 code units.
pub fn to_json_data_from_utf16(units: &[u16]) -> Result<Option<JsonValue>, ParseError> {
    decode::parse_utf16(units)
}

/// Read a source to its end and parse it.
pub fn to_json_data_from_reader<R: Read>(reader: R) -> Result<Option<JsonValue>, JsonError> {
    decode::parse_reader(reader)
}

// ── Value → text ─────────────────────────────────────────────

/// Serialize with the default layout.  An absent value is `null`.
pub fn to_json(value: Option<&JsonValue>) -> String {
    encode::encode_value(value)
}

/// Serialize with explicit options.
pub fn to_json_with(value: Option<&JsonValue>, options: &WriterOptions) -> String {
    encode::encode_value_with(value, options)
}

/// Serialize into a byte sink.
pub fn to_json_writer<W: Write>(value: Option<&JsonValue>, sink: W) -> Result<(), JsonError> {
    encode::encode_to_writer(value, &WriterOptions::default(), sink)
}
