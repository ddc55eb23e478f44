//! Forgiving readers for persisted JSON.
//!
//! Settings files are hand-edited and written by older versions, so a field
//! of the wrong type falls back to its default instead of failing the whole
//! document. Use with `#[serde(deserialize_with = "...")]`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret a loosely typed JSON number the way a form field would:
/// negatives clamp to zero, fractions truncate, numeric strings are parsed.
pub fn count_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(clamp_count)
            .or_else(|| n.as_u64().map(|v| v.min(u64::from(u32::MAX)) as u32))
            .or_else(|| n.as_f64().map(|f| clamp_count(f as i64))),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| clamp_count(f as i64)),
        _ => None,
    }
}

/// Clamp an externally supplied count into the internal non-negative range.
pub fn clamp_count(raw: i64) -> u32 {
    raw.clamp(0, i64::from(u32::MAX)) as u32
}

/// `true`/`false`, `"true"`/`"false"` or a number; anything else is `None`.
pub fn flag_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

/// Text, with numbers and booleans stringified and anything else empty.
pub fn text_from_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(text_from_value(Value::deserialize(d)?))
}

pub fn flag_or_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(flag_from_value(&Value::deserialize(d)?).unwrap_or(false))
}

pub fn flag_or_true<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(flag_from_value(&Value::deserialize(d)?).unwrap_or(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_accept_form_input() {
        assert_eq!(count_from_value(&json!(7)), Some(7));
        assert_eq!(count_from_value(&json!(-3)), Some(0));
        assert_eq!(count_from_value(&json!(4.9)), Some(4));
        assert_eq!(count_from_value(&json!(" 12 ")), Some(12));
        assert_eq!(count_from_value(&json!("many")), None);
        assert_eq!(count_from_value(&Value::Null), None);
    }

    #[test]
    fn flags_accept_strings_and_numbers() {
        assert_eq!(flag_from_value(&json!(true)), Some(true));
        assert_eq!(flag_from_value(&json!("False")), Some(false));
        assert_eq!(flag_from_value(&json!(0)), Some(false));
        assert_eq!(flag_from_value(&Value::Null), None);
        assert_eq!(flag_from_value(&json!([true])), None);
    }

    #[test]
    fn text_never_fails() {
        assert_eq!(text_from_value(json!("hi")), "hi");
        assert_eq!(text_from_value(json!(42)), "42");
        assert_eq!(text_from_value(Value::Null), "");
        assert_eq!(text_from_value(json!({"a": 1})), "");
    }
}
