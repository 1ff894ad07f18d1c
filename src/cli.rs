//! Command-line value parsers.
//!
//! Each parser has the `fn(&str) -> Result<T, String>` shape clap's
//! `value_parser` accepts.

use crate::model::{parse_scalar, FieldValue, RecordKey};
use crate::state::query::{FilterValue, SortDirection, SortSpec};

/// A typed command-line value: numbers and booleans keep their type,
/// everything else goes through [`parse_scalar`].
pub fn parse_value(raw: &str) -> FieldValue {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<f64>() {
        if n.is_finite() {
            return FieldValue::Number(n);
        }
    }
    match raw {
        "true" => FieldValue::Bool(true),
        "false" => FieldValue::Bool(false),
        _ => parse_scalar(raw),
    }
}

fn split_key_value<'a>(raw: &'a str, separator: char, what: &str) -> Result<(&'a str, &'a str), String> {
    let (key, value) = raw
        .split_once(separator)
        .ok_or_else(|| format!("expected {what}, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((key, value.trim()))
}

/// `FIELD` or `FIELD:asc` / `FIELD:desc`.
pub fn parse_sort(raw: &str) -> Result<SortSpec, String> {
    let (field, direction) = match raw.split_once(':') {
        None => (raw, SortDirection::Ascending),
        Some((field, "asc")) => (field, SortDirection::Ascending),
        Some((field, "desc")) => (field, SortDirection::Descending),
        Some((_, other)) => return Err(format!("unknown sort direction '{other}'")),
    };
    let field = field.trim();
    if field.is_empty() {
        return Err("missing sort field".to_string());
    }
    Ok(SortSpec {
        field: field.to_string(),
        direction,
    })
}

/// A typed value plus its literal text when the two differ, so `123` also
/// matches a text field holding `"123"`.
fn equality_candidates(raw: &str) -> Vec<FieldValue> {
    match parse_value(raw) {
        text @ FieldValue::Text(_) => vec![text],
        typed => vec![typed, FieldValue::text(raw)],
    }
}

/// `KEY=V` for equality, `KEY=V1,V2,..` for membership.
///
/// Values that type as numbers, booleans or dates also match the same
/// literal stored as text.
pub fn parse_filter(raw: &str) -> Result<(String, FilterValue), String> {
    let (key, values) = split_key_value(raw, '=', "KEY=VALUE[,VALUE..]")?;
    let mut options: Vec<FieldValue> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .flat_map(equality_candidates)
        .collect();
    let filter = match options.len() {
        0 => return Err(format!("no values given for '{key}'")),
        1 => FilterValue::Equals(options.remove(0)),
        _ => FilterValue::OneOf(options),
    };
    Ok((key.to_string(), filter))
}

/// `KEY=FROM..TO`, either bound may be left out.
pub fn parse_range(raw: &str) -> Result<(String, FilterValue), String> {
    let (key, bounds) = split_key_value(raw, '=', "KEY=FROM..TO")?;
    let (from, to) = bounds
        .split_once("..")
        .ok_or_else(|| format!("expected FROM..TO, got '{bounds}'"))?;
    let bound = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| parse_value(s))
    };
    Ok((
        key.to_string(),
        FilterValue::Range {
            from: bound(from),
            to: bound(to),
        },
    ))
}

/// `KEY=true` or `KEY=false`.
pub fn parse_flag(raw: &str) -> Result<(String, FilterValue), String> {
    let (key, value) = split_key_value(raw, '=', "KEY=true|false")?;
    let flag = match value {
        "true" | "yes" | "1" => true,
        "false" | "no" | "0" => false,
        other => return Err(format!("expected true or false, got '{other}'")),
    };
    Ok((key.to_string(), FilterValue::Flag(flag)))
}

/// A record id as typed: integers stay integers.
pub fn parse_id(raw: &str) -> Result<RecordKey, String> {
    RecordKey::parse(raw).ok_or_else(|| "empty record id".to_string())
}
