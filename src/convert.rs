//! Primitive conversion table.
//!
//! Every JSON scalar kind converts to every primitive target:
//!
//! | from \ to | bool          | integers        | floats        | text            | char            |
//! |-----------|---------------|-----------------|---------------|-----------------|-----------------|
//! | Boolean   | as is         | 0 / 1           | 0.0 / 1.0     | "True"/"False"  | unsupported     |
//! | Int, Long | non-zero      | range-checked   | widened       | decimal         | code point      |
//! | Double    | non-zero      | half-to-even    | range-checked | decimal         | unsupported     |
//! | String    | true/false    | trimmed decimal | trimmed float | as is           | exactly one     |
//!
//! Out-of-range results are `ERR_OVERFLOW`, unparsable text is `ERR_FORMAT`
//! and conversions with no defined meaning are `ERR_UNSUPPORTED`.

use std::any::type_name;
use std::fmt::Display;
use std::num::{IntErrorKind, ParseFloatError, ParseIntError};
use std::str::FromStr;

use num_traits::{Float, NumCast, PrimInt, ToPrimitive};

use crate::errors::*;
use crate::value::JsonValue;

/// `ERR_UNSUPPORTED` for a value whose variant cannot become `target`.
pub(crate) fn unsupported(target: &str, value: &JsonValue) -> JsonError {
    JsonError::new(
        ERR_UNSUPPORTED,
        format!("cannot convert {} to {}", value.json_type(), target),
    )
}

fn overflow(value: impl Display, target: &str) -> JsonError {
    JsonError::new(
        ERR_OVERFLOW,
        format!("{} is out of range for {}", value, target),
    )
}

fn bad_text(text: &str, target: &str) -> JsonError {
    JsonError::new(ERR_FORMAT, format!("{:?} is not a valid {}", text, target))
}

pub(crate) fn to_bool(value: &JsonValue) -> Result<bool, JsonError> {
    match value {
        JsonValue::Boolean(b) => Ok(*b),
        JsonValue::Int(i) => Ok(*i != 0),
        JsonValue::Long(l) => Ok(*l != 0),
        JsonValue::Double(d) => Ok(*d != 0.0),
        JsonValue::String(s) => {
            let text = s.trim();
            if text.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if text.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(bad_text(s, "bool"))
            }
        }
        other => Err(unsupported("bool", other)),
    }
}

pub(crate) fn to_integer<T>(value: &JsonValue) -> Result<T, JsonError>
where
    T: PrimInt + FromStr<Err = ParseIntError>,
{
    let target = type_name::<T>();
    match value {
        JsonValue::Boolean(b) => Ok(if *b { T::one() } else { T::zero() }),
        JsonValue::Int(i) => cast(*i, target),
        JsonValue::Long(l) => cast(*l, target),
        JsonValue::Double(d) => {
            if !d.is_finite() {
                return Err(overflow(d, target));
            }
            cast(d.round_ties_even(), target)
        }
        JsonValue::String(s) => s.trim().parse::<T>().map_err(|err| match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => overflow(s, target),
            _ => bad_text(s, target),
        }),
        other => Err(unsupported(target, other)),
    }
}

pub(crate) fn to_float<T>(value: &JsonValue) -> Result<T, JsonError>
where
    T: Float + FromStr<Err = ParseFloatError>,
{
    let target = type_name::<T>();
    match value {
        JsonValue::Boolean(b) => Ok(if *b { T::one() } else { T::zero() }),
        JsonValue::Int(i) => cast(*i, target),
        JsonValue::Long(l) => cast(*l, target),
        JsonValue::Double(d) if !d.is_finite() => cast(*d, target),
        JsonValue::Double(d) => {
            let narrowed: T = cast(*d, target)?;
            if narrowed.is_infinite() {
                return Err(overflow(d, target));
            }
            Ok(narrowed)
        }
        JsonValue::String(s) => s.trim().parse::<T>().map_err(|_| bad_text(s, target)),
        other => Err(unsupported(target, other)),
    }
}

pub(crate) fn to_text(value: &JsonValue) -> Result<String, JsonError> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Boolean(true) => Ok("True".to_string()),
        JsonValue::Boolean(false) => Ok("False".to_string()),
        JsonValue::Int(i) => Ok(i.to_string()),
        JsonValue::Long(l) => Ok(l.to_string()),
        JsonValue::Double(d) => Ok(d.to_string()),
        other => Err(unsupported("string", other)),
    }
}

pub(crate) fn to_char(value: &JsonValue) -> Result<char, JsonError> {
    let from_code = |code: i64| {
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| overflow(code, "char"))
    };
    match value {
        JsonValue::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(bad_text(s, "char")),
            }
        }
        JsonValue::Int(i) => from_code((*i).into()),
        JsonValue::Long(l) => from_code(*l),
        other => Err(unsupported("char", other)),
    }
}

fn cast<S, T>(value: S, target: &str) -> Result<T, JsonError>
where
    S: ToPrimitive + Display + Copy,
    T: NumCast,
{
    <T as NumCast>::from(value).ok_or_else(|| overflow(value, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_round_half_to_even() {
        assert_eq!(to_integer::<i32>(&JsonValue::Double(2.5)).unwrap(), 2);
        assert_eq!(to_integer::<i32>(&JsonValue::Double(3.5)).unwrap(), 4);
        assert_eq!(to_integer::<i32>(&JsonValue::Double(-2.5)).unwrap(), -2);
        assert_eq!(to_integer::<u8>(&JsonValue::Double(255.4)).unwrap(), 255);
    }

    #[test]
    fn narrowing_is_range_checked() {
        assert_eq!(to_integer::<u8>(&JsonValue::Int(256)).unwrap_err().code, ERR_OVERFLOW);
        assert_eq!(to_integer::<u32>(&JsonValue::Int(-1)).unwrap_err().code, ERR_OVERFLOW);
        assert_eq!(
            to_integer::<i16>(&JsonValue::String("40000".into())).unwrap_err().code,
            ERR_OVERFLOW
        );
        assert_eq!(
            to_float::<f32>(&JsonValue::Double(1e300)).unwrap_err().code,
            ERR_OVERFLOW
        );
        assert_eq!(
            to_integer::<i64>(&JsonValue::Double(f64::NAN)).unwrap_err().code,
            ERR_OVERFLOW
        );
    }

    #[test]
    fn text_conversions() {
        assert!(to_bool(&JsonValue::String(" TRUE ".into())).unwrap());
        assert_eq!(to_bool(&JsonValue::String("yes".into())).unwrap_err().code, ERR_FORMAT);
        assert_eq!(to_integer::<i32>(&JsonValue::String(" -12 ".into())).unwrap(), -12);
        assert_eq!(to_integer::<i32>(&JsonValue::String("1x".into())).unwrap_err().code, ERR_FORMAT);
        assert_eq!(to_float::<f64>(&JsonValue::String("2.5".into())).unwrap(), 2.5);
        assert_eq!(to_text(&JsonValue::Boolean(true)).unwrap(), "True");
        assert_eq!(to_text(&JsonValue::Double(0.5)).unwrap(), "0.5");
    }

    #[test]
    fn chars() {
        assert_eq!(to_char(&JsonValue::String("x".into())).unwrap(), 'x');
        assert_eq!(to_char(&JsonValue::Int(65)).unwrap(), 'A');
        assert_eq!(to_char(&JsonValue::String("xy".into())).unwrap_err().code, ERR_FORMAT);
        assert_eq!(to_char(&JsonValue::Int(0xD800)).unwrap_err().code, ERR_OVERFLOW);
        assert_eq!(to_char(&JsonValue::Boolean(true)).unwrap_err().code, ERR_UNSUPPORTED);
    }

    #[test]
    fn collections_are_unsupported() {
        assert_eq!(to_bool(&JsonValue::array()).unwrap_err().code, ERR_UNSUPPORTED);
        assert_eq!(to_text(&JsonValue::object()).unwrap_err().code, ERR_UNSUPPORTED);
    }
}
