//! Field codec — encodes and decodes single field values.
//!
//! The escaping rules here are part of the snapshot format and must not change:
//!
//! - `&` is written as `&amp;` and read back as `&`.
//! - U+000B and U+000C are written as a backslash so the document stays well-formed.
//!   This substitution is one-way.
//!
//! Nothing else is escaped. Text fields may carry rich-text markup, which is
//! written raw and comes back verbatim through the parser.

use chrono::NaiveDateTime;

use crate::model::{FieldValue, ValueKind};
use crate::schema::{self, SUPPRESS_ZERO};
use crate::{Error, Result};

/// Literal syntax of timestamps; the parse-side twin of `NaiveDateTime`'s `Display`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const AMP_ESCAPE: &str = "&amp;";

/// Encode a value for the document. Returns `None` when the field must be omitted.
pub fn encode(value: &FieldValue, pattern: Option<&str>) -> Option<String> {
    if pattern == Some(SUPPRESS_ZERO) && value.is_zero() {
        return None;
    }
    Some(match value {
        FieldValue::Text(s) => escape_text(s),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Timestamp(t) => t.to_string(),
    })
}

/// Decode the raw text content of a field element.
///
/// `item1type` and `item2type` always decode as `Integer`: older snapshots
/// tagged them `Number`.
pub fn decode(declared: ValueKind, field_name: &str, raw: &str) -> Result<FieldValue> {
    let kind = if schema::is_endpoint_kind_field(field_name) {
        ValueKind::Integer
    } else {
        declared
    };

    match kind {
        ValueKind::Text => Ok(FieldValue::Text(unescape_text(raw))),
        ValueKind::Integer => raw
            .trim()
            .parse::<i32>()
            .map(FieldValue::Integer)
            .map_err(|e| decode_error(field_name, kind, raw, e)),
        ValueKind::Number => raw
            .trim()
            .parse::<i64>()
            .map(FieldValue::Number)
            .map_err(|e| decode_error(field_name, kind, raw, e)),
        ValueKind::Timestamp => NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
            .map(FieldValue::Timestamp)
            .map_err(|e| decode_error(field_name, kind, raw, e)),
    }
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str(AMP_ESCAPE),
            '\u{0B}' | '\u{0C}' => out.push('\\'),
            c => out.push(c),
        }
    }
    out
}

pub fn unescape_text(s: &str) -> String {
    s.replace(AMP_ESCAPE, "&")
}

fn decode_error(field: &str, kind: ValueKind, raw: &str, err: impl std::fmt::Display) -> Error {
    Error::Decode {
        field: field.to_string(),
        message: format!("cannot read {:?} as {kind}: {err}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(h, m, s, milli)
            .unwrap()
    }

    #[test]
    fn test_ampersand_escaping() {
        assert_eq!(escape_text("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(unescape_text("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_text(&escape_text("&amp;")), "&amp;");
    }

    #[test]
    fn test_control_bytes_become_backslash() {
        assert_eq!(escape_text("a\u{0B}b\u{0C}c"), "a\\b\\c");
        // other control characters are left alone
        assert_eq!(escape_text("a\tb\nc"), "a\tb\nc");
    }

    #[test]
    fn test_markup_is_not_escaped() {
        assert_eq!(escape_text("<b>bold</b>"), "<b>bold</b>");
    }

    #[test]
    fn test_suppress_zero() {
        assert_eq!(encode(&FieldValue::Integer(0), Some(" ")), None);
        assert_eq!(encode(&FieldValue::Number(0), Some(" ")), None);
        assert_eq!(encode(&FieldValue::Integer(1984), Some(" ")).as_deref(), Some("1984"));
        assert_eq!(encode(&FieldValue::Integer(0), None).as_deref(), Some("0"));
        assert_eq!(encode(&FieldValue::Text(String::new()), Some(" ")).as_deref(), Some(""));
    }

    #[test]
    fn test_timestamp_literal_roundtrip() {
        for t in [ts(12, 30, 0, 0), ts(23, 59, 59, 250)] {
            let text = encode(&FieldValue::Timestamp(t), None).unwrap();
            assert_eq!(decode(ValueKind::Timestamp, "created", &text).unwrap(), FieldValue::Timestamp(t));
        }
        assert_eq!(encode(&FieldValue::Timestamp(ts(12, 30, 0, 0)), None).unwrap(), "2024-03-01 12:30:00");
    }

    #[test]
    fn test_timestamp_rejects_other_syntax() {
        assert!(decode(ValueKind::Timestamp, "created", "01.03.2024 12:30").is_err());
        assert!(decode(ValueKind::Timestamp, "created", "2024-03-01T12:30:00Z").is_err());
    }

    #[test]
    fn test_endpoint_kind_override() {
        let tagged_number = decode(ValueKind::Number, "item1type", "1").unwrap();
        let tagged_integer = decode(ValueKind::Integer, "item1type", "1").unwrap();
        assert_eq!(tagged_number, FieldValue::Integer(1));
        assert_eq!(tagged_number, tagged_integer);
        assert_eq!(decode(ValueKind::Number, "item2type", "3").unwrap(), FieldValue::Integer(3));
        // only the two reserved names are overridden
        assert_eq!(decode(ValueKind::Number, "item1id", "1").unwrap(), FieldValue::Number(1));
    }

    #[test]
    fn test_endpoint_kind_override_beats_text_tag() {
        assert_eq!(decode(ValueKind::Text, "item2type", "2").unwrap(), FieldValue::Integer(2));
    }

    #[test]
    fn test_decode_errors() {
        let err = decode(ValueKind::Integer, "born", "nineteen").unwrap_err();
        assert!(matches!(err, Error::Decode { ref field, .. } if field == "born"));
        assert!(decode(ValueKind::Integer, "year", "99999999999").is_err());
        assert!(decode(ValueKind::Number, "id", "").is_err());
    }

    #[test]
    fn test_numeric_whitespace_is_trimmed() {
        assert_eq!(decode(ValueKind::Number, "id", " 42\n").unwrap(), FieldValue::Number(42));
    }
}
