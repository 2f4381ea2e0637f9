//! Error codes, the crate-wide error type, and parser diagnostics.
//!
//! Value-model and mapper failures are reported as [`JsonError`] carrying one
//! of the `ERR_*` codes below.  Text parsing reports the richer
//! [`ParseError`], which records where the parser stopped and which character
//! it was looking at; it converts into `JsonError` with code [`ERR_PARSE`]
//! ([`ERR_DUP_KEY`] for a repeated object key).

use std::fmt;

// ── Error codes ──────────────────────────────────────────────

/// Wrong accessor for the active variant, or an importer produced a value of
/// a different type than requested.
pub const ERR_TYPE_MISMATCH: &str = "ERR_TYPE_MISMATCH";
/// Object insert of a key that is already present, including a key
/// repeated in parsed text.
pub const ERR_DUP_KEY: &str = "ERR_DUP_KEY";
/// Array position outside `0..count`.
pub const ERR_INDEX: &str = "ERR_INDEX";
/// Text could not be parsed as JSON.
pub const ERR_PARSE: &str = "ERR_PARSE";
/// The JSON shape cannot be mapped onto the requested type.
pub const ERR_UNSUPPORTED: &str = "ERR_UNSUPPORTED";
/// A numeric conversion does not fit the target width.
pub const ERR_OVERFLOW: &str = "ERR_OVERFLOW";
/// Text is not in a format the target type accepts (numbers, enum names,
/// invalid UTF-8 input).
pub const ERR_FORMAT: &str = "ERR_FORMAT";
/// Reading or writing the caller's source/sink failed.
pub const ERR_IO: &str = "ERR_IO";

/// Crate-wide error.
///
/// `code` is one of the `ERR_*` constants and is what callers match on;
/// `message` is human-readable context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonError {
    pub code: &'static str,
    pub message: String,
}

impl JsonError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: &str, found: impl fmt::Display) -> Self {
        Self::new(
            ERR_TYPE_MISMATCH,
            format!("expected {}, found {}", expected, found),
        )
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonError {}

impl From<std::io::Error> for JsonError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ERR_IO, err.to_string())
    }
}

// ── Parse errors ─────────────────────────────────────────────

/// The closed set of parser failures.
///
/// The first nine are grammar errors.  The last two are limits the parser
/// enforces on well-formed text: an object may not repeat a key, and
/// containers may not nest deeper than [`MAX_DEPTH`](crate::constants::MAX_DEPTH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnexpectedEnd,
    InvalidValue,
    ExpectName,
    ExpectPairSeparator,
    ExpectValue,
    ExpectObjectEndOrValueSeparator,
    ExpectArrayEndOrValueSeparator,
    InvalidHexValueInString,
    InvalidNumber,
    DuplicateKey,
    NestingTooDeep,
}

impl ParseErrorKind {
    /// Fixed human-readable message for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedEnd => "Unexpected end of json",
            ParseErrorKind::InvalidValue => "Invalid json value",
            ParseErrorKind::ExpectName => "Expect name of pair",
            ParseErrorKind::ExpectPairSeparator => "Expect pair separator \":\"",
            ParseErrorKind::ExpectValue => "Expect value of pair",
            ParseErrorKind::ExpectObjectEndOrValueSeparator => {
                "Expect object end \"}\" or value separator \",\""
            }
            ParseErrorKind::ExpectArrayEndOrValueSeparator => {
                "Expect array end \"]\" or value separator \",\""
            }
            ParseErrorKind::InvalidHexValueInString => "Invalid hex value in string",
            ParseErrorKind::InvalidNumber => "Invalid number",
            ParseErrorKind::DuplicateKey => "Duplicate name in object",
            ParseErrorKind::NestingTooDeep => "Containers nested too deeply",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A parse failure and the position it happened at.
///
/// `line` and `column` are 1-based.  `offset` counts characters consumed
/// before the failure.  `ch` is the lookahead character that triggered the
/// error, or `None` at end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub ch: Option<char>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error ({}, {}): {}", self.line, self.column, self.kind)?;
        match self.ch {
            Some(c) => write!(f, ", ch = {:?}", c),
            None => f.write_str(", at end of input"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A repeated key keeps the code the value model uses for the same
/// mistake; every other kind is `ERR_PARSE`.
impl From<ParseError> for JsonError {
    fn from(err: ParseError) -> Self {
        let code = match err.kind {
            ParseErrorKind::DuplicateKey => ERR_DUP_KEY,
            _ => ERR_PARSE,
        };
        JsonError::new(code, err.to_string())
    }
}
