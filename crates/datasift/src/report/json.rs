//! JSON helpers for boundary-facing structures.
//!
//! Every number that leaves the library passes through here so that
//! non-finite values are emitted as `null` instead of something a JSON
//! decoder would reject.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Encode a number; NaN and infinities become `null`, integral values render as integers.
pub fn number(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INT {
        return Value::from(value as i64);
    }
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Encode an optional number.
pub fn optional_number(value: Option<f64>) -> Value {
    value.map(number).unwrap_or(Value::Null)
}

/// Text form used for cell matching and display.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INT {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Serialize any value to a JSON tree, then normalize every number in it.
pub fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(normalize(serde_json::to_value(value)?))
}

/// Recursively rewrite a JSON tree so floats that hold integral values become integers.
///
/// `serde_json` already maps non-finite floats to `null` when building a
/// `Value`; this pass keeps the integer rendering consistent with [`number`].
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => number(f),
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Stats {
        mean: f64,
        std: Option<f64>,
        nested: Vec<f64>,
    }

    #[test]
    fn test_number_non_finite_is_null() {
        assert_eq!(number(f64::NAN), Value::Null);
        assert_eq!(number(f64::INFINITY), Value::Null);
        assert_eq!(number(2.0), json!(2));
        assert_eq!(number(2.5), json!(2.5));
    }

    #[test]
    fn test_to_value_cleans_nested_structures() {
        let stats = Stats {
            mean: f64::NAN,
            std: None,
            nested: vec![1.0, f64::NEG_INFINITY, 0.5],
        };
        let value = to_value(&stats).unwrap();
        assert_eq!(value, json!({"mean": null, "std": null, "nested": [1, null, 0.5]}));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-5.0), "-5");
        assert_eq!(format_number(1.25), "1.25");
    }
}
