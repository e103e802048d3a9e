//! Parsing of interpretation-service answers into structured rules.
//!
//! This is a pure function of the answer text and the raw rules it answers,
//! so it can be tested with canned responses.

use serde_json::{Map, Value};

use super::rule::{CompareOp, Condition, StructuredRule};
use crate::error::{DatasiftError, Result};
use crate::input::RawRule;

/// Outcome of parsing one answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRules {
    /// Structured rules paired with the index of the raw rule they came from.
    pub rules: Vec<(usize, StructuredRule)>,
    /// Entries that could not be read, with the raw rule index when known.
    pub rejected: Vec<(Option<usize>, String)>,
}

/// Strip a markdown code fence if the answer is wrapped in one.
pub fn extract_json(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(response)
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(response)
    } else {
        response.trim()
    }
}

/// Parse an answer into structured rules.
///
/// Accepts a JSON array of entries, or an object with a `rules` array. Each
/// entry looks like
/// `{"rule_index": 0, "kind": "range", "columns": ["Amount"], "expected": {"min": 0, "min_inclusive": false}, "description": "..."}`.
/// A known kind with unusable parameters, or an unknown kind, becomes
/// [`Condition::Unevaluable`]; an entry that is not an object, or points
/// at a rule that does not exist, is rejected.
///
/// Returns an error when the answer as a whole is not JSON of that shape.
pub fn parse_rules_response(response: &str, raw_rules: &[RawRule]) -> Result<ParsedRules> {
    let root: Value = serde_json::from_str(extract_json(response))
        .map_err(|e| DatasiftError::Llm(format!("Unparsable rules response: {}", e)))?;

    let entries = match root {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("rules") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DatasiftError::Llm(
                    "Rules response object has no 'rules' array".to_string(),
                ));
            }
        },
        _ => {
            return Err(DatasiftError::Llm(
                "Rules response is not a JSON array".to_string(),
            ));
        }
    };

    let mut parsed = ParsedRules::default();

    for (position, entry) in entries.into_iter().enumerate() {
        let Value::Object(entry) = entry else {
            parsed
                .rejected
                .push((None, format!("Entry {} is not an object", position)));
            continue;
        };

        let index = match entry.get("rule_index") {
            Some(v) => match v.as_u64() {
                Some(i) => i as usize,
                None => {
                    parsed
                        .rejected
                        .push((None, format!("Entry {} has an invalid rule_index", position)));
                    continue;
                }
            },
            None => position,
        };

        let Some(raw) = raw_rules.get(index) else {
            parsed.rejected.push((
                Some(index),
                format!("Entry {} refers to unknown rule {}", position, index),
            ));
            continue;
        };

        let description = entry
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| raw.description())
            .unwrap_or_default()
            .to_string();

        parsed
            .rules
            .push((index, StructuredRule::new(description, parse_condition(&entry))));
    }

    Ok(parsed)
}

fn unevaluable(kind: &str, reason: impl Into<String>) -> Condition {
    Condition::Unevaluable {
        rule_kind: kind.to_string(),
        reason: reason.into(),
    }
}

fn parse_condition(entry: &Map<String, Value>) -> Condition {
    let kind = entry
        .get("kind")
        .or_else(|| entry.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .trim()
        .to_ascii_lowercase();

    let columns: Vec<String> = match entry.get("columns").or_else(|| entry.get("column")) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };
    let expected = entry.get("expected").cloned().unwrap_or(Value::Null);

    let needs = |n: usize| -> Option<Condition> {
        if columns.len() < n {
            Some(unevaluable(
                &kind,
                format!("expected {} column(s), got {}", n, columns.len()),
            ))
        } else {
            None
        }
    };

    match kind.as_str() {
        "one_of" | "equality" | "equals" | "allowed_values" | "in_set" => {
            if let Some(bad) = needs(1) {
                return bad;
            }
            let values: Vec<String> = match &expected {
                Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
                Value::Object(map) => map
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(scalar_text).collect())
                    .unwrap_or_default(),
                other => scalar_text(other).into_iter().collect(),
            };
            if values.is_empty() {
                return unevaluable(&kind, "no expected values");
            }
            Condition::OneOf {
                column: columns[0].clone(),
                values,
            }
        }
        "range" => {
            if let Some(bad) = needs(1) {
                return bad;
            }
            let Value::Object(bounds) = &expected else {
                return unevaluable(&kind, "range bounds must be an object");
            };
            let min = bounds.get("min").and_then(number_of);
            let max = bounds.get("max").and_then(number_of);
            if min.is_none() && max.is_none() {
                return unevaluable(&kind, "range has neither min nor max");
            }
            Condition::Range {
                column: columns[0].clone(),
                min,
                max,
                min_inclusive: bounds
                    .get("min_inclusive")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
                max_inclusive: bounds
                    .get("max_inclusive")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            }
        }
        "pattern" | "regex" | "format" => {
            if let Some(bad) = needs(1) {
                return bad;
            }
            let pattern = match &expected {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map
                    .get("pattern")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            };
            match pattern {
                Some(pattern) if !pattern.is_empty() => Condition::Pattern {
                    column: columns[0].clone(),
                    pattern,
                },
                _ => unevaluable(&kind, "no pattern given"),
            }
        }
        "compare" | "cross_column" | "comparison" => {
            if let Some(bad) = needs(2) {
                return bad;
            }
            let op_text = match &expected {
                Value::String(s) => Some(s.as_str()),
                Value::Object(map) => map.get("op").and_then(Value::as_str),
                _ => None,
            };
            match op_text.and_then(CompareOp::parse) {
                Some(op) => Condition::Compare {
                    left: columns[0].clone(),
                    op,
                    right: columns[1].clone(),
                },
                None => unevaluable(&kind, "unknown comparison operator"),
            }
        }
        "required" | "not_null" | "non_null" => {
            if let Some(bad) = needs(1) {
                return bad;
            }
            Condition::Required { columns }
        }
        other => unevaluable(other, "unrecognized rule kind"),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_f64().map(crate::report::json::format_number),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
