// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! JSON field extraction shared by the parsers
//!
//! Providers disagree on whether numbers are strings, integers, floats or hex.
//! These helpers accept every shape seen in practice and report a readable
//! reason when a value is unusable, so parsers can drop the record and warn.

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared_types::amount;

/// Looks up a JSON pointer; an empty pointer selects the value itself
pub fn lookup<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        return Some(value);
    }
    value.pointer(pointer).filter(|found| !found.is_null())
}

/// Reads a field as text; numbers and booleans are rendered
pub fn text(value: &Value, pointer: &str) -> Option<String> {
    match lookup(value, pointer)? {
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads a raw integer amount
///
/// Accepts decimal strings, `0x` hex strings, unsigned integers and floats
/// without a fractional part.
pub fn raw_amount(value: &Value, pointer: &str) -> Result<u128, String> {
    match lookup(value, pointer) {
        None => Err(format!("missing amount field `{pointer}`")),
        Some(found) => amount_value(found),
    }
}

/// Converts a single JSON value into a raw integer amount
pub fn amount_value(found: &Value) -> Result<u128, String> {
    match found {
        Value::String(text) => amount::parse_raw(text).map_err(|e| e.to_string()),
        Value::Number(number) => {
            if let Some(integer) = number.as_u64() {
                return Ok(u128::from(integer));
            }
            match number.as_f64() {
                Some(float) if float >= 0.0 && float.fract() == 0.0 && float < 3.4e38 => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    Ok(float as u128)
                }
                _ => Err(format!("invalid raw amount `{number}`")),
            }
        }
        other => Err(format!("invalid raw amount `{other}`")),
    }
}

/// Reads an unsigned integer given as a number or a decimal string
pub fn unsigned(value: &Value, pointer: &str) -> Option<u64> {
    match lookup(value, pointer)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a timestamp given as unix seconds, unix milliseconds or RFC 3339 text
#[allow(clippy::cast_possible_truncation)]
pub fn timestamp(value: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    let found = lookup(value, pointer)?;
    let seconds = match found {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64))?,
        Value::String(text) => match text.trim().parse::<i64>() {
            Ok(seconds) => seconds,
            Err(_) => {
                return DateTime::parse_from_rfc3339(text.trim())
                    .ok()
                    .map(|parsed| parsed.with_timezone(&Utc));
            }
        },
        _ => return None,
    };
    // Values past the year 2286 in seconds are milliseconds.
    if seconds > 9_999_999_999 {
        DateTime::from_timestamp_millis(seconds)
    } else {
        DateTime::from_timestamp(seconds, 0)
    }
}

/// Selects the records of a response
///
/// Without a pointer, a list body yields its elements, `null` yields nothing
/// and any other body is a single record. With a pointer, the target must be
/// a list; a missing target is an empty list.
pub fn records<'a>(value: &'a Value, pointer: Option<&str>) -> Result<Vec<&'a Value>, String> {
    let Some(pointer) = pointer else {
        return Ok(match value {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        });
    };
    match lookup(value, pointer) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(other) => Err(format!(
            "expected a list at `{pointer}`, found {}",
            kind(other)
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
