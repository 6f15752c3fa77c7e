//! Field value type: the four value kinds a snapshot field can carry.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single field value.
///
/// Closed set: every consumer matches all four variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    Text(String),
    Integer(i32),
    Number(i64),
    Timestamp(NaiveDateTime),
}

/// Tag of a `FieldValue`, as written in a field element's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Text,
    Integer,
    Number,
    Timestamp,
}

impl ValueKind {
    pub fn tag(self) -> &'static str {
        match self {
            ValueKind::Text => "Text",
            ValueKind::Integer => "Integer",
            ValueKind::Number => "Number",
            ValueKind::Timestamp => "Timestamp",
        }
    }

    /// Parse a document tag. `None` for a tag outside the four kinds.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Text" => Some(ValueKind::Text),
            "Integer" => Some(ValueKind::Integer),
            "Number" => Some(ValueKind::Number),
            "Timestamp" => Some(ValueKind::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Integer(_) => ValueKind::Integer,
            FieldValue::Number(_) => ValueKind::Number,
            FieldValue::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Widen either integer kind to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(i64::from(*i)),
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Number(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, FieldValue::Integer(0) | FieldValue::Number(0))
    }
}

impl From<i32> for FieldValue { fn from(v: i32) -> Self { FieldValue::Integer(v) } }
impl From<i64> for FieldValue { fn from(v: i64) -> Self { FieldValue::Number(v) } }
impl From<String> for FieldValue { fn from(v: String) -> Self { FieldValue::Text(v) } }
impl From<&str> for FieldValue { fn from(v: &str) -> Self { FieldValue::Text(v.to_owned()) } }
impl From<NaiveDateTime> for FieldValue { fn from(v: NaiveDateTime) -> Self { FieldValue::Timestamp(v) } }

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Timestamp(t) => write!(f, "{t}"),
        }
    }
}
