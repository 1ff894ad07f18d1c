//! Record abstraction and typed field values.
//!
//! The controller never interprets entity semantics. A buyer, a product or an
//! offer are all just [`Record`]s: something with a stable identifier and a bag
//! of typed fields that predicates and comparators can look at.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

// ===== Record =====

/// A row-level entity managed by a list screen.
///
/// Implemented once per entity type; everything in `state` is generic over it.
pub trait Record {
    /// Stable unique identifier. Selection is keyed by this, never by row index.
    type Id: Clone + Eq + Ord + Hash + fmt::Debug;

    /// The record's identifier.
    fn id(&self) -> Self::Id;

    /// Look up a field by key. `None` means the record has no such field,
    /// which predicates and comparators treat like [`FieldValue::Null`].
    fn field(&self, key: &str) -> Option<FieldValue>;
}

// ===== FieldValue =====

/// A typed field value.
///
/// Serialized untagged. On deserialization, strings that parse as RFC 3339
/// become [`FieldValue::Timestamp`] and `YYYY-MM-DD` strings become
/// [`FieldValue::Date`]; everything else stays text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent or JSON `null`.
    Null,
    /// A boolean flag.
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// Free text.
    Text(String),
    /// A calendar date.
    Date(NaiveDate),
    /// A point in time, normalized to UTC.
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Build a text value.
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Whether this is [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Rank used to order values of different kinds against each other.
    fn kind_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::Text(_) => 3,
            FieldValue::Date(_) | FieldValue::Timestamp(_) => 4,
        }
    }

    /// Whether [`compare_natural`](Self::compare_natural) gives a meaningful
    /// answer for the pair, rather than just ordering by kind.
    pub fn is_comparable_with(&self, other: &FieldValue) -> bool {
        self.kind_rank() == other.kind_rank()
    }

    /// Calendar date of a date-like value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Timestamp(ts) => Some(ts.date_naive()),
            _ => None,
        }
    }

    /// Natural ordering used for column sorts and range filters.
    ///
    /// Text compares case-insensitively, numbers numerically, dates and
    /// timestamps chronologically (a date against a timestamp compares by the
    /// timestamp's UTC calendar date). Values of different kinds order by kind.
    /// `Null` orders before everything; callers that want nulls last handle
    /// that themselves.
    pub fn compare_natural(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => compare_text_folded(a, b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (a, b) if a.kind_rank() == 4 && b.kind_rank() == 4 => a.as_date().cmp(&b.as_date()),
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    /// String used for substring search. `Null` and `Bool` are not searchable.
    pub fn search_text(&self) -> Option<String> {
        match self {
            FieldValue::Null | FieldValue::Bool(_) => None,
            FieldValue::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Case-insensitive comparison by lowercase fold, without allocating.
fn compare_text_folded(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().flat_map(char::to_lowercase);
    let mut right = b.chars().flat_map(char::to_lowercase);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match l.cmp(&r) {
                Ordering::Equal => continue,
                ord => return ord,
            },
        }
    }
}

/// Largest magnitude below which every integer is exact in an `f64` (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `n` as an integer when it has no fractional part and is exactly representable.
fn whole_number(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER).then_some(n as i64)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => match whole_number(*n) {
                Some(i) => write!(f, "{}", i),
                None => write!(f, "{}", n),
            },
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(f64::from(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

/// Interpret a raw string the way record files spell values.
pub fn parse_scalar(raw: &str) -> FieldValue {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return FieldValue::Timestamp(ts.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return FieldValue::Date(d);
    }
    FieldValue::Text(raw.to_string())
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null),
            Value::String(s) => parse_scalar(&s),
            // Nested structures are kept searchable as their JSON text.
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Number(n) => match whole_number(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            FieldValue::Text(s) => serializer.serialize_str(s),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(FieldValue::from)
    }
}

// ===== RecordKey =====

/// Identifier of a [`DynRecord`]: a JSON integer or a non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// Integer id.
    Int(i64),
    /// String id.
    Str(String),
}

impl RecordKey {
    /// Parse a key as typed on a command line: integers stay integers.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.parse::<i64>() {
            Ok(n) => RecordKey::Int(n),
            Err(_) => RecordKey::Str(raw.to_string()),
        })
    }
}

impl From<i64> for RecordKey {
    fn from(n: i64) -> Self {
        RecordKey::Int(n)
    }
}

impl From<i32> for RecordKey {
    fn from(n: i32) -> Self {
        RecordKey::Int(i64::from(n))
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        RecordKey::Str(s.to_string())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(n) => write!(f, "{}", n),
            RecordKey::Str(s) => f.write_str(s),
        }
    }
}

// ===== DynRecord =====

/// A schemaless record: an id plus named fields.
///
/// Deserializes from a flat JSON object whose `id` member is the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynRecord {
    /// The `id` member.
    pub id: RecordKey,
    /// Every other member, by name.
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl DynRecord {
    /// Record with no fields yet.
    pub fn new(id: impl Into<RecordKey>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl Record for DynRecord {
    type Id = RecordKey;

    fn id(&self) -> RecordKey {
        self.id.clone()
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        if key == "id" {
            return Some(match &self.id {
                RecordKey::Int(n) => FieldValue::Number(*n as f64),
                RecordKey::Str(s) => FieldValue::Text(s.clone()),
            });
        }
        self.fields.get(key).cloned()
    }
}

// ===== Tests =====
