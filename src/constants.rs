//! Normative constants shared by the parser, serializer and object mapper.

/// Reserved object field carrying the type-identity hash of an exported
/// record or custom-exported value.  Importers treat it as metadata.
pub const TYPE_HASH_FIELD: &str = "@TypeHash";

// ── Limits ───────────────────────────────────────────────────

/// Maximum nesting of objects and arrays.  The parser rejects deeper text
/// and the serializer writes `null` in place of a container past the limit.
pub const MAX_DEPTH: usize = 512;

// ── Serializer layout ────────────────────────────────────────
// The writer indents one step per nesting level, and object values are
// additionally shifted by the width of their `"key" : ` prefix so nested
// containers line up under their opening bracket.

/// Default number of spaces added per nesting level.
pub const DEFAULT_INDENT_STEP: usize = 1;

/// Separator written between an object key and its value.
pub const KEY_SEPARATOR: &str = " : ";

/// Columns occupied by a key prefix beyond the key's own characters:
/// two quotes plus the separator.
pub const KEY_PREFIX_OVERHEAD: usize = 2 + KEY_SEPARATOR.len();

/// Text written for an absent value.
pub const NULL_LITERAL: &str = "null";

// ── Mapper ───────────────────────────────────────────────────

/// Bookkeeping field names of generic containers.  Never exported or
/// imported regardless of markers.
pub const INFRASTRUCTURE_FIELDS: &[&str] = &["_size", "_version", "_syncRoot"];
