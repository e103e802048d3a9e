//! Structured, machine-checkable rules.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::report::json;

/// Comparison operator for cross-column rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    /// Parse the spellings interpretation services commonly use.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "<" | "lt" | "less_than" | "before" => Some(CompareOp::Lt),
            "<=" | "le" | "lte" | "less_than_or_equal" | "less_than_or_equal_to" | "at_most" => {
                Some(CompareOp::Le)
            }
            ">" | "gt" | "greater_than" | "after" => Some(CompareOp::Gt),
            ">=" | "ge" | "gte" | "greater_than_or_equal" | "greater_than_or_equal_to"
            | "at_least" => Some(CompareOp::Ge),
            "=" | "==" | "eq" | "equal" | "equals" | "equal_to" => Some(CompareOp::Eq),
            "!=" | "<>" | "ne" | "not_equal" | "not_equal_to" | "differs" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// Apply the operator to an ordering of left against right.
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
        }
    }
}

fn default_inclusive() -> bool {
    true
}

/// Predicate over one or more columns.
///
/// Each variant has exactly one evaluator in the validator. Anything the
/// interpreter could not map onto a known variant is kept as `Unevaluable`
/// so it is reported rather than silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Cell must equal one of the listed values.
    OneOf { column: String, values: Vec<String> },
    /// Numeric cell must fall within the bounds.
    Range {
        column: String,
        min: Option<f64>,
        max: Option<f64>,
        #[serde(default = "default_inclusive")]
        min_inclusive: bool,
        #[serde(default = "default_inclusive")]
        max_inclusive: bool,
    },
    /// Cell text must fully match a regular expression.
    Pattern { column: String, pattern: String },
    /// Relation between two columns of the same row.
    Compare {
        left: String,
        op: CompareOp,
        right: String,
    },
    /// Listed columns must be present.
    Required { columns: Vec<String> },
    /// A rule kind the validator cannot check. `rule_kind` is the kind the
    /// service named, kept apart from the `kind` tag.
    Unevaluable { rule_kind: String, reason: String },
}

impl Condition {
    /// Short kind name.
    pub fn kind_name(&self) -> &str {
        match self {
            Condition::OneOf { .. } => "one_of",
            Condition::Range { .. } => "range",
            Condition::Pattern { .. } => "pattern",
            Condition::Compare { .. } => "compare",
            Condition::Required { .. } => "required",
            Condition::Unevaluable { rule_kind, .. } => rule_kind,
        }
    }

    /// Referenced columns in reference order.
    pub fn columns(&self) -> Vec<String> {
        match self {
            Condition::OneOf { column, .. }
            | Condition::Range { column, .. }
            | Condition::Pattern { column, .. } => vec![column.clone()],
            Condition::Compare { left, right, .. } => vec![left.clone(), right.clone()],
            Condition::Required { columns } => columns.clone(),
            Condition::Unevaluable { .. } => Vec::new(),
        }
    }

    /// Expected format or values, as JSON.
    pub fn expected(&self) -> Value {
        match self {
            Condition::OneOf { values, .. } => json!(values),
            Condition::Range {
                min,
                max,
                min_inclusive,
                max_inclusive,
                ..
            } => json!({
                "min": json::optional_number(*min),
                "max": json::optional_number(*max),
                "min_inclusive": min_inclusive,
                "max_inclusive": max_inclusive,
            }),
            Condition::Pattern { pattern, .. } => json!(pattern),
            Condition::Compare { op, .. } => json!(op),
            Condition::Required { .. } => json!("present"),
            Condition::Unevaluable { .. } => Value::Null,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::OneOf { column, values } => {
                write!(f, "{} in [{}]", column, values.join(", "))
            }
            Condition::Range {
                column,
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let mut parts = Vec::new();
                if let Some(min) = min {
                    let op = if *min_inclusive { ">=" } else { ">" };
                    parts.push(format!("{} {} {}", column, op, json::format_number(*min)));
                }
                if let Some(max) = max {
                    let op = if *max_inclusive { "<=" } else { "<" };
                    parts.push(format!("{} {} {}", column, op, json::format_number(*max)));
                }
                if parts.is_empty() {
                    write!(f, "{} is numeric", column)
                } else {
                    write!(f, "{}", parts.join(" and "))
                }
            }
            Condition::Pattern { column, pattern } => write!(f, "{} matches /{}/", column, pattern),
            Condition::Compare { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Condition::Required { columns } => write!(f, "{} present", columns.join(", ")),
            Condition::Unevaluable { rule_kind, reason } => {
                write!(f, "unevaluable {} ({})", rule_kind, reason)
            }
        }
    }
}

/// Interpreter output: one machine-checkable rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRule {
    /// Human-readable description, used in violation justifications.
    pub description: String,
    /// The predicate to evaluate.
    pub condition: Condition,
    /// Referenced columns, derived from the condition.
    pub columns: Vec<String>,
    /// Expected format or values, derived from the condition.
    #[serde(default)]
    pub expected_format_or_values: Value,
}

impl StructuredRule {
    pub fn new(description: impl Into<String>, condition: Condition) -> Self {
        let columns = condition.columns();
        let expected_format_or_values = condition.expected();
        Self {
            description: description.into(),
            condition,
            columns,
            expected_format_or_values,
        }
    }

    /// Expected format or values for this rule.
    pub fn expected(&self) -> &Value {
        &self.expected_format_or_values
    }

    pub fn is_evaluable(&self) -> bool {
        !matches!(self.condition, Condition::Unevaluable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_derived_in_order() {
        let rule = StructuredRule::new(
            "start before end",
            Condition::Compare {
                left: "start".into(),
                op: CompareOp::Lt,
                right: "end".into(),
            },
        );
        assert_eq!(rule.columns, vec!["start", "end"]);
        assert_eq!(rule.expected(), &json!("lt"));
    }

    #[test]
    fn test_unevaluable_serde_round_trip() {
        let rule = StructuredRule::new(
            "checksum must validate",
            Condition::Unevaluable {
                rule_kind: "checksum".into(),
                reason: "unknown kind".into(),
            },
        );
        let encoded = serde_json::to_value(&rule).unwrap();
        assert_eq!(encoded["condition"]["kind"], json!("unevaluable"));
        assert_eq!(encoded["condition"]["rule_kind"], json!("checksum"));
        assert_eq!(encoded["expected_format_or_values"], Value::Null);

        let decoded: StructuredRule = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, rule);
        assert_eq!(decoded.condition.kind_name(), "checksum");
    }

    #[test]
    fn test_serialized_rule_carries_expected_values() {
        let rule = StructuredRule::new(
            "Country must be US or CA",
            Condition::OneOf {
                column: "Country".into(),
                values: vec!["US".into(), "CA".into()],
            },
        );
        let encoded = serde_json::to_value(&rule).unwrap();
        assert_eq!(encoded["expected_format_or_values"], json!(["US", "CA"]));
        assert_eq!(encoded["columns"], json!(["Country"]));
    }

    #[test]
    fn test_compare_op_parse() {
        assert_eq!(CompareOp::parse("less than"), Some(CompareOp::Lt));
        assert_eq!(CompareOp::parse(">="), Some(CompareOp::Ge));
        assert_eq!(CompareOp::parse("not-equal"), Some(CompareOp::Ne));
        assert_eq!(CompareOp::parse("roughly"), None);
    }

    #[test]
    fn test_condition_display() {
        let positive = Condition::Range {
            column: "Amount".into(),
            min: Some(0.0),
            max: None,
            min_inclusive: false,
            max_inclusive: true,
        };
        assert_eq!(positive.to_string(), "Amount > 0");
    }

    #[test]
    fn test_condition_serde_tagged() {
        let condition: Condition = serde_json::from_value(json!({
            "kind": "range",
            "column": "age",
            "min": 0,
            "max": 120
        }))
        .unwrap();
        assert_eq!(
            condition,
            Condition::Range {
                column: "age".into(),
                min: Some(0.0),
                max: Some(120.0),
                min_inclusive: true,
                max_inclusive: true,
            }
        );
    }
}
