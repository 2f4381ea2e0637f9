//! JSON text serializer.
//!
//! Writes a value tree as indented text.  Indentation comes from a stack of
//! column widths rather than from recursion depth: each container pushes one
//! indent step, and a value written after an object key is additionally
//! shifted by the width of its `"key" : ` prefix.  Nested containers
//! therefore open on the key's line and close aligned under their opening
//! bracket:
//!
//! ```text
//! {
//!  "a" : 1,
//!  "b" : [
//!        1,
//!        2
//!       ]
//! }
//! ```
//!
//! Escaping covers exactly `\t`, `\r`, `\n`, `"` and `\`; every other
//! character is written verbatim.  Absent values and `Unknown` are written as
//! `null`.  Containers nested deeper than `MAX_DEPTH` (only reachable by
//! building a tree by hand) are also written as `null`.  Output always ends
//! with a newline.

use std::fmt::Write as _;
use std::io;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::*;
use crate::errors::JsonError;
use crate::value::{JsonArray, JsonObject, JsonValue};

/// Serializer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Spaces added per nesting level.
    pub indent_step: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            indent_step: DEFAULT_INDENT_STEP,
        }
    }
}

struct Writer {
    out: String,
    indents: Vec<usize>,
    step: usize,
    depth: usize,
}

impl Writer {
    fn push_indent(&mut self, offset: usize) {
        let top = self.indents.last().copied().unwrap_or(0);
        self.indents.push(top + offset);
    }

    fn pop_indent(&mut self) {
        self.indents.pop();
    }

    fn newline(&mut self) {
        let width = self.indents.last().copied().unwrap_or(0);
        self.out.push('\n');
        self.out.extend(std::iter::repeat(' ').take(width));
    }

    fn value(&mut self, value: Option<&JsonValue>, offset: usize) {
        let Some(value) = value else {
            self.out.push_str(NULL_LITERAL);
            return;
        };
        match value {
            JsonValue::Unknown => self.out.push_str(NULL_LITERAL),
            JsonValue::Object(_) | JsonValue::Array(_) if self.depth >= MAX_DEPTH => {
                warn!(max_depth = MAX_DEPTH, "container nested too deeply, written as null");
                self.out.push_str(NULL_LITERAL);
            }
            JsonValue::Object(map) => {
                self.push_indent(offset);
                self.depth += 1;
                self.object(map);
                self.depth -= 1;
                self.pop_indent();
            }
            JsonValue::Array(items) => {
                self.push_indent(offset);
                self.depth += 1;
                self.array(items);
                self.depth -= 1;
                self.pop_indent();
            }
            JsonValue::String(s) => self.string(s),
            JsonValue::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            JsonValue::Int(i) => {
                let _ = write!(self.out, "{}", i);
            }
            JsonValue::Long(l) => {
                let _ = write!(self.out, "{}", l);
            }
            JsonValue::Double(d) => self.out.push_str(&double_text(*d)),
        }
    }

    fn object(&mut self, map: &JsonObject) {
        self.out.push('{');
        self.push_indent(self.step);
        let count = map.len();
        for (i, (key, value)) in map.iter().enumerate() {
            self.newline();
            let key_text = escape(&key.to_string());
            self.out.push('"');
            self.out.push_str(&key_text);
            self.out.push('"');
            self.out.push_str(KEY_SEPARATOR);
            let offset = key_text.chars().count() + KEY_PREFIX_OVERHEAD;
            self.value(value.as_ref(), offset);
            if i + 1 != count {
                self.out.push(',');
            }
        }
        self.pop_indent();
        self.newline();
        self.out.push('}');
    }

    fn array(&mut self, items: &JsonArray) {
        self.out.push('[');
        self.push_indent(self.step);
        let count = items.len();
        for (i, item) in items.iter().enumerate() {
            self.newline();
            self.value(item.as_ref(), 0);
            if i + 1 != count {
                self.out.push(',');
            }
        }
        self.pop_indent();
        self.newline();
        self.out.push(']');
    }

    fn string(&mut self, s: &str) {
        self.out.push('"');
        self.out.push_str(&escape(s));
        self.out.push('"');
    }
}

/// Escape the five characters the writer escapes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Shortest text that parses back to the same `f64` and still reads as a
/// double: it always carries a fraction or an exponent.  Non-finite values
/// have no JSON spelling and are written as `null`.
fn double_text(d: f64) -> String {
    if !d.is_finite() {
        return NULL_LITERAL.to_string();
    }
    let mut text = format!("{:?}", d);
    if !text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        text.push_str(".0");
    }
    text
}

/// Serialize with explicit options.
pub fn encode_value_with(value: Option<&JsonValue>, options: &WriterOptions) -> String {
    let mut writer = Writer {
        out: String::new(),
        indents: vec![0],
        step: options.indent_step,
        depth: 0,
    };
    writer.value(value, 0);
    writer.out.push('\n');
    writer.out
}

/// Serialize with default options.
pub fn encode_value(value: Option<&JsonValue>) -> String {
    encode_value_with(value, &WriterOptions::default())
}

/// Serialize into a byte sink as UTF-8.
pub fn encode_to_writer<W: io::Write>(
    value: Option<&JsonValue>,
    options: &WriterOptions,
    mut sink: W,
) -> Result<(), JsonError> {
    sink.write_all(encode_value_with(value, options).as_bytes())?;
    sink.flush()?;
    Ok(())
}
