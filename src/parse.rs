//! Scalar and list literal parsing from CSV tokens into [`PropValue`]
//! (spec §6 CSV layout, §7 ParseError).

use time::format_description::well_known::Iso8601;
use time::{Date, OffsetDateTime};

use crate::error::{ErrorLocation, LoadError, Result};
use crate::types::TypeId;
use crate::value::{Interval, PropValue};

/// Parses one scalar token (already split out of its `:TYPE:value` token or
/// structured column) into a [`PropValue`] of the declared type. An empty
/// token is null and represented by `None`.
pub fn parse_scalar(raw: &str, type_id: TypeId, loc: &ErrorLocation) -> Result<Option<PropValue>> {
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(Some(match type_id {
        TypeId::Int64 => PropValue::Int64(
            raw.parse::<i64>()
                .map_err(|e| LoadError::parse(loc.clone(), format!("bad INT64 literal '{raw}': {e}")))?,
        ),
        TypeId::Double => PropValue::Double(
            raw.parse::<f64>()
                .map_err(|e| LoadError::parse(loc.clone(), format!("bad DOUBLE literal '{raw}': {e}")))?,
        ),
        TypeId::Bool => PropValue::Bool(parse_bool(raw, loc)?),
        TypeId::Date => PropValue::Date(parse_date(raw, loc)?),
        TypeId::Timestamp => PropValue::Timestamp(parse_timestamp(raw, loc)?),
        TypeId::Interval => PropValue::Interval(parse_interval(raw, loc)?),
        TypeId::String => PropValue::Str(raw.to_string()),
        TypeId::List => {
            return Err(LoadError::Internal(
                "parse_scalar called on a List type; use parse_list".into(),
            ))
        }
    }))
}

fn parse_bool(raw: &str, loc: &ErrorLocation) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(LoadError::parse(loc.clone(), format!("bad BOOL literal '{raw}'"))),
    }
}

/// Days since the Unix epoch, matching `TypeId::Date`'s 4-byte width.
fn parse_date(raw: &str, loc: &ErrorLocation) -> Result<i32> {
    let date = Date::parse(raw, &time::format_description::well_known::Iso8601::DEFAULT)
        .map_err(|e| LoadError::parse(loc.clone(), format!("bad DATE literal '{raw}': {e}")))?;
    let epoch = Date::from_ordinal_date(1970, 1).expect("valid epoch date");
    Ok((date - epoch).whole_days() as i32)
}

/// Microseconds since the Unix epoch.
fn parse_timestamp(raw: &str, loc: &ErrorLocation) -> Result<i64> {
    let dt = OffsetDateTime::parse(raw, &Iso8601::DEFAULT)
        .map_err(|e| LoadError::parse(loc.clone(), format!("bad TIMESTAMP literal '{raw}': {e}")))?;
    Ok(dt.unix_timestamp() * 1_000_000 + dt.microsecond() as i64)
}

/// `PnYnMnDTnHnMnS`-shaped interval literal or a simplified
/// `"<days> days <micros> us"` form; months/days/microseconds are stored
/// independently (spec §3 `Interval`, no normalization across units).
fn parse_interval(raw: &str, loc: &ErrorLocation) -> Result<Interval> {
    let mut months = 0i32;
    let mut days = 0i32;
    let mut micros = 0i64;
    let mut num = String::new();
    let mut chars = raw.chars().peekable();
    if chars.peek() != Some(&'P') {
        return Err(LoadError::parse(loc.clone(), format!("bad INTERVAL literal '{raw}'")));
    }
    chars.next();
    let mut in_time = false;
    for c in chars {
        if c == 'T' {
            in_time = true;
            continue;
        }
        if c.is_ascii_digit() || c == '-' {
            num.push(c);
            continue;
        }
        let n: i64 = num.parse().map_err(|_| {
            LoadError::parse(loc.clone(), format!("bad INTERVAL literal '{raw}'"))
        })?;
        num.clear();
        match c {
            'Y' => months += (n * 12) as i32,
            'M' if !in_time => months += n as i32,
            'W' => days += (n * 7) as i32,
            'D' => days += n as i32,
            'H' => micros += n * 3_600_000_000,
            'M' => micros += n * 60_000_000,
            'S' => micros += n * 1_000_000,
            _ => return Err(LoadError::parse(loc.clone(), format!("bad INTERVAL literal '{raw}'"))),
        }
    }
    Ok(Interval { months, days, micros })
}

/// Parses a `[a,b,c]`-delimited list literal into nested [`PropValue::List`]
/// / scalar elements, given the child element's scalar type id.
pub fn parse_list(
    raw: &str,
    list_begin: char,
    list_end: char,
    child: TypeId,
    loc: &ErrorLocation,
) -> Result<PropValue> {
    let trimmed = raw.trim();
    if !trimmed.starts_with(list_begin) || !trimmed.ends_with(list_end) {
        return Err(LoadError::parse(loc.clone(), "list literal missing begin/end delimiter"));
    }
    let inner = &trimmed[list_begin.len_utf8()..trimmed.len() - list_end.len_utf8()];
    if inner.trim().is_empty() {
        return Ok(PropValue::List(Vec::new()));
    }
    let mut values = Vec::new();
    for tok in split_top_level(inner, list_begin, list_end) {
        let tok = tok.trim();
        if child == TypeId::List {
            values.push(parse_list(tok, list_begin, list_end, TypeId::String, loc)?);
        } else {
            match parse_scalar(tok, child, loc)? {
                Some(v) => values.push(v),
                None => return Err(LoadError::parse(loc.clone(), "null element inside list")),
            }
        }
    }
    Ok(PropValue::List(values))
}

fn split_top_level(s: &str, open: char, close: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
        } else if c == ',' && depth == 0 {
            out.push(&s[start..i]);
            start = i + 1;
        }
    }
    out.push(&s[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> ErrorLocation {
        ErrorLocation::default()
    }

    #[test]
    fn parses_empty_token_as_null() {
        assert_eq!(parse_scalar("", TypeId::Int64, &loc()).unwrap(), None);
    }

    #[test]
    fn parses_int_double_bool() {
        assert_eq!(parse_scalar("42", TypeId::Int64, &loc()).unwrap(), Some(PropValue::Int64(42)));
        assert_eq!(parse_scalar("1.5", TypeId::Double, &loc()).unwrap(), Some(PropValue::Double(1.5)));
        assert_eq!(parse_scalar("true", TypeId::Bool, &loc()).unwrap(), Some(PropValue::Bool(true)));
    }

    #[test]
    fn rejects_malformed_bool() {
        assert!(parse_scalar("maybe", TypeId::Bool, &loc()).is_err());
    }

    #[test]
    fn parses_flat_int_list() {
        let v = parse_list("[1,2,3]", '[', ']', TypeId::Int64, &loc()).unwrap();
        assert_eq!(
            v,
            PropValue::List(vec![PropValue::Int64(1), PropValue::Int64(2), PropValue::Int64(3)])
        );
    }

    #[test]
    fn parses_empty_list() {
        let v = parse_list("[]", '[', ']', TypeId::Int64, &loc()).unwrap();
        assert_eq!(v, PropValue::List(vec![]));
    }
}
