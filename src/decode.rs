//! JSON text parser.
//!
//! Single pass, one character of lookahead, one function per grammar rule.
//! All cursor state lives in the [`Parser`] value, so independent parses
//! never share anything.
//!
//! Numbers follow the promotion rule of the value model:
//!   integral, fits 32 bits     → Int
//!   integral, fits 64 bits     → Long
//!   fraction or exponent       → Double
//!   integral beyond 64 bits    → Double
//!
//! A key repeated within one object is `DuplicateKey`, and containers
//! nested deeper than `MAX_DEPTH` are `NestingTooDeep`.
//!
//! `null` parses to `None`.  An input that is empty or all whitespace is
//! "no document" and also yields `Ok(None)`.  Anything after the root value
//! is not examined.

use std::io::Read;

use tracing::debug;

use crate::constants::MAX_DEPTH;
use crate::errors::*;
use crate::value::{JsonArray, JsonKey, JsonObject, JsonValue};

const BOM: char = '\u{feff}';

/// Cursor over a character source.
pub struct Parser<I: Iterator<Item = char>> {
    chars: I,
    ch: Option<char>,
    offset: usize,
    line: usize,
    column: usize,
    depth: usize,
}

impl<I: Iterator<Item = char>> Parser<I> {
    pub fn new(chars: I) -> Self {
        Self {
            chars,
            ch: None,
            offset: 0,
            line: 1,
            column: 0,
            depth: 0,
        }
    }

    /// Parse one document.
    pub fn parse(mut self) -> Result<Option<JsonValue>, ParseError> {
        self.bump();
        if self.ch == Some(BOM) {
            self.bump();
        }
        self.skip_whitespace();
        if self.ch.is_none() {
            return Ok(None);
        }
        self.value()
    }

    // ── Cursor ───────────────────────────────────────────────

    fn bump(&mut self) {
        match self.ch {
            Some('\n') => {
                self.line += 1;
                self.column = 0;
                self.offset += 1;
            }
            Some(_) => self.offset += 1,
            None => {}
        }
        self.ch = self.chars.next();
        self.column += 1;
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        debug!(
            line = self.line,
            column = self.column,
            offset = self.offset,
            ch = ?self.ch,
            "json parse error: {}",
            kind
        );
        ParseError {
            kind,
            line: self.line,
            column: self.column,
            offset: self.offset,
            ch: self.ch,
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(' ' | '\t' | '\n' | '\r')) {
            self.bump();
        }
    }

    /// Skip whitespace before a token that must follow.
    fn expect_more(&mut self) -> Result<char, ParseError> {
        self.skip_whitespace();
        self.ch.ok_or_else(|| self.error(ParseErrorKind::UnexpectedEnd))
    }

    // ── Grammar ──────────────────────────────────────────────

    fn value(&mut self) -> Result<Option<JsonValue>, ParseError> {
        match self.expect_more()? {
            '{' => self.nested(Self::object).map(Some),
            '[' => self.nested(Self::array).map(Some),
            '"' => self.string().map(|s| Some(JsonValue::String(s))),
            '-' | '0'..='9' => self.number().map(Some),
            't' | 'f' | 'n' => self.literal(),
            _ => Err(self.error(ParseErrorKind::InvalidValue)),
        }
    }

    /// Parse one container, one level deeper.
    fn nested(
        &mut self,
        container: fn(&mut Self) -> Result<JsonValue, ParseError>,
    ) -> Result<JsonValue, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(ParseErrorKind::NestingTooDeep));
        }
        self.depth += 1;
        let parsed = container(self);
        self.depth -= 1;
        parsed
    }

    fn object(&mut self) -> Result<JsonValue, ParseError> {
        // eat '{'
        self.bump();
        let mut map = JsonObject::new();
        if self.expect_more()? == '}' {
            self.bump();
            return Ok(JsonValue::Object(map));
        }

        loop {
            if self.expect_more()? != '"' {
                return Err(self.error(ParseErrorKind::ExpectName));
            }
            let key = JsonKey::from(self.string()?);
            if map.contains_key(&key) {
                return Err(self.error(ParseErrorKind::DuplicateKey));
            }

            if self.expect_more()? != ':' {
                return Err(self.error(ParseErrorKind::ExpectPairSeparator));
            }
            self.bump();

            if !starts_value(self.expect_more()?) {
                return Err(self.error(ParseErrorKind::ExpectValue));
            }
            let value = self.value()?;
            map.insert(key, value);

            match self.expect_more()? {
                ',' => self.bump(),
                '}' => {
                    self.bump();
                    return Ok(JsonValue::Object(map));
                }
                _ => return Err(self.error(ParseErrorKind::ExpectObjectEndOrValueSeparator)),
            }
        }
    }

    fn array(&mut self) -> Result<JsonValue, ParseError> {
        // eat '['
        self.bump();
        let mut items = JsonArray::new();
        if self.expect_more()? == ']' {
            self.bump();
            return Ok(JsonValue::Array(items));
        }

        loop {
            items.push(self.value()?);
            match self.expect_more()? {
                ',' => self.bump(),
                ']' => {
                    self.bump();
                    return Ok(JsonValue::Array(items));
                }
                _ => return Err(self.error(ParseErrorKind::ExpectArrayEndOrValueSeparator)),
            }
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        // eat '"'
        self.bump();
        let mut out = String::new();
        loop {
            match self.ch {
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some('"') => {
                    self.bump();
                    return Ok(out);
                }
                Some('\\') => {
                    self.bump();
                    self.escape(&mut out)?;
                }
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Decode one escape.  The backslash is already consumed and the
    /// lookahead is the escape letter.
    fn escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let c = self
            .ch
            .ok_or_else(|| self.error(ParseErrorKind::UnexpectedEnd))?;
        match c {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                let unit = self.hex4()?;
                return self.code_unit(unit, out);
            }
            // Unknown escapes keep the escaped character.
            other => out.push(other),
        }
        self.bump();
        Ok(())
    }

    /// Read the four hex digits after `u`, leaving the cursor past them.
    fn hex4(&mut self) -> Result<u32, ParseError> {
        let mut unit = 0;
        for _ in 0..4 {
            self.bump();
            let c = self
                .ch
                .ok_or_else(|| self.error(ParseErrorKind::UnexpectedEnd))?;
            let digit = c
                .to_digit(16)
                .ok_or_else(|| self.error(ParseErrorKind::InvalidHexValueInString))?;
            unit = unit * 16 + digit;
        }
        self.bump();
        Ok(unit)
    }

    /// Append one UTF-16 code unit.  A high surrogate directly followed by a
    /// `\u` low surrogate is combined; unpaired surrogates become U+FFFD.
    fn code_unit(&mut self, unit: u32, out: &mut String) -> Result<(), ParseError> {
        if !(0xD800..=0xDBFF).contains(&unit) {
            out.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
            return Ok(());
        }
        if self.ch != Some('\\') {
            out.push(char::REPLACEMENT_CHARACTER);
            return Ok(());
        }
        self.bump();
        if self.ch != Some('u') {
            out.push(char::REPLACEMENT_CHARACTER);
            return self.escape(out);
        }
        let low = self.hex4()?;
        if (0xDC00..=0xDFFF).contains(&low) {
            let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
            out.push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
            Ok(())
        } else {
            out.push(char::REPLACEMENT_CHARACTER);
            self.code_unit(low, out)
        }
    }

    fn number(&mut self) -> Result<JsonValue, ParseError> {
        let mut token = String::new();
        if self.ch == Some('-') {
            token.push('-');
            self.bump();
        }
        self.digits(&mut token)?;

        if self.ch == Some('.') {
            token.push('.');
            self.bump();
            self.digits(&mut token)?;
        }

        if let Some(e @ ('e' | 'E')) = self.ch {
            token.push(e);
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.ch {
                token.push(sign);
                self.bump();
            }
            self.digits(&mut token)?;
        }

        number_from_token(&token).ok_or_else(|| self.error(ParseErrorKind::InvalidNumber))
    }

    /// Mandatory run of decimal digits.
    fn digits(&mut self, token: &mut String) -> Result<(), ParseError> {
        if !matches!(self.ch, Some('0'..='9')) {
            return Err(self.error(ParseErrorKind::InvalidNumber));
        }
        while let Some(c @ '0'..='9') = self.ch {
            token.push(c);
            self.bump();
        }
        Ok(())
    }

    fn literal(&mut self) -> Result<Option<JsonValue>, ParseError> {
        let (word, value) = match self.ch {
            Some('t') => ("true", Some(JsonValue::Boolean(true))),
            Some('f') => ("false", Some(JsonValue::Boolean(false))),
            _ => ("null", None),
        };
        for expected in word.chars() {
            if self.ch != Some(expected) {
                return Err(self.error(ParseErrorKind::InvalidValue));
            }
            self.bump();
        }
        Ok(value)
    }
}

fn starts_value(c: char) -> bool {
    matches!(c, '{' | '[' | '"' | '-' | '0'..='9' | 't' | 'f' | 'n')
}

/// Classify a JSON number token.  Shared with the serde adapter so both
/// paths apply the same width promotion.
pub(crate) fn number_from_token(token: &str) -> Option<JsonValue> {
    if token.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return token.parse::<f64>().ok().map(JsonValue::Double);
    }
    match token.parse::<i64>() {
        Ok(n) => Some(match i32::try_from(n) {
            Ok(i) => JsonValue::Int(i),
            Err(_) => JsonValue::Long(n),
        }),
        Err(_) => token.parse::<f64>().ok().map(JsonValue::Double),
    }
}

// ── Entry points ─────────────────────────────────────────────

/// Parse JSON text.
pub fn parse_str(text: &str) -> Result<Option<JsonValue>, ParseError> {
    Parser::new(text.chars()).parse()
}

/// Parse UTF-16 code units.  Unpaired surrogates in the raw text decode as
/// U+FFFD.
pub fn parse_utf16(units: &[u16]) -> Result<Option<JsonValue>, ParseError> {
    let chars = char::decode_utf16(units.iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER));
    Parser::new(chars).parse()
}

/// Parse encoded bytes.  A UTF-16 byte-order mark selects UTF-16 (LE or BE);
/// anything else must be valid UTF-8.
pub fn parse_slice(raw: &[u8]) -> Result<Option<JsonValue>, JsonError> {
    match raw {
        [0xFF, 0xFE, rest @ ..] => Ok(parse_utf16(&utf16_units(rest, u16::from_le_bytes)?)?),
        [0xFE, 0xFF, rest @ ..] => Ok(parse_utf16(&utf16_units(rest, u16::from_be_bytes)?)?),
        _ => {
            let text = std::str::from_utf8(raw)
                .map_err(|e| JsonError::new(ERR_FORMAT, format!("invalid UTF-8 in JSON input: {}", e)))?;
            Ok(parse_str(text)?)
        }
    }
}

/// Read a source to its end and parse it.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Option<JsonValue>, JsonError> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    parse_slice(&raw)
}

fn utf16_units(raw: &[u8], decode: fn([u8; 2]) -> u16) -> Result<Vec<u16>, JsonError> {
    if raw.len() % 2 != 0 {
        return Err(JsonError::new(ERR_FORMAT, "odd byte count in UTF-16 input"));
    }
    Ok(raw.chunks_exact(2).map(|pair| decode([pair[0], pair[1]])).collect())
}
