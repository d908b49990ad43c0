//! SQLite value conversions shared by the table store and the source reader.
//!
//! Each conversion returns a plain-text reason on failure; callers wrap it
//! in `EtlError::MalformedValue` with the table, column and row.

use crate::types::{CustomerId, DATE_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{Value, ValueRef};

pub(crate) fn to_text(value: ValueRef<'_>) -> Result<Option<String>, String> {
    match value {
        ValueRef::Null       => Ok(None),
        ValueRef::Text(b)    => std::str::from_utf8(b)
            .map(|s| Some(s.to_string()))
            .map_err(|e| format!("invalid UTF-8: {e}")),
        // Numeric-looking attributes (phone numbers) often arrive typed.
        ValueRef::Integer(i) => Ok(Some(i.to_string())),
        ValueRef::Real(f)    => Ok(Some(f.to_string())),
        ValueRef::Blob(_)    => Err("binary value in a text column".into()),
    }
}

pub(crate) fn to_key(value: ValueRef<'_>) -> Result<CustomerId, String> {
    match value {
        ValueRef::Integer(i) => Ok(i),
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        ValueRef::Real(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as CustomerId)
        }
        ValueRef::Real(f) => Err(format!("{f} is not an integer key")),
        ValueRef::Text(b) => {
            let s = std::str::from_utf8(b).map_err(|e| format!("invalid UTF-8: {e}"))?;
            s.trim()
                .parse()
                .map_err(|_| format!("'{s}' is not an integer key"))
        }
        ValueRef::Null => Err("null key".into()),
        other => Err(format!("unsupported key type {:?}", other.data_type())),
    }
}

pub(crate) fn to_integer(value: ValueRef<'_>) -> Result<i64, String> {
    match value {
        ValueRef::Integer(i) => Ok(i),
        other => Err(format!("expected integer, found {:?}", other.data_type())),
    }
}

/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS` (time dropped).
pub(crate) fn to_date(value: ValueRef<'_>) -> Result<Option<NaiveDate>, String> {
    let Some(text) = to_text(value)? else {
        return Ok(None);
    };
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(Some(date));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|dt| Some(dt.date()))
        .map_err(|_| format!("'{text}' is not a date"))
}

pub(crate) fn to_flag(value: ValueRef<'_>) -> Result<bool, String> {
    match value {
        ValueRef::Integer(0) => Ok(false),
        ValueRef::Integer(1) => Ok(true),
        ValueRef::Text(b) => match std::str::from_utf8(b).unwrap_or_default().to_ascii_lowercase().as_str() {
            "0" | "false" => Ok(false),
            "1" | "true"  => Ok(true),
            other         => Err(format!("'{other}' is not a boolean")),
        },
        other => Err(format!("expected boolean, found {:?}", other.data_type())),
    }
}

pub(crate) fn text_value(value: Option<&str>) -> Value {
    match value {
        Some(s) => Value::Text(s.to_string()),
        None    => Value::Null,
    }
}

pub(crate) fn date_value(value: Option<NaiveDate>) -> Value {
    match value {
        Some(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        None    => Value::Null,
    }
}

pub(crate) fn flag_value(value: bool) -> Value {
    Value::Integer(i64::from(value))
}
