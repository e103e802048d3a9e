//! Row-by-row evaluation of structured rules.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rule::{CompareOp, Condition, StructuredRule};
use crate::input::{Dataset, Schema, Value};
use crate::pipeline::Stage;
use crate::warning::{Warning, WarningKind};

/// How cell values are matched against rule values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Compare text exactly; when false, text and patterns ignore case.
    pub case_sensitive: bool,
    /// Absolute slack for numeric equality and inclusive bounds.
    pub numeric_tolerance: f64,
    /// Trim surrounding whitespace from text before matching.
    pub trim_whitespace: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            numeric_tolerance: 1e-9,
            trim_whitespace: true,
        }
    }
}

impl MatchOptions {
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_numeric_tolerance(mut self, tolerance: f64) -> Self {
        self.numeric_tolerance = tolerance.abs();
        self
    }

    pub fn with_trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    fn normalize_text(&self, text: &str) -> String {
        let text = if self.trim_whitespace { text.trim() } else { text };
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }
}

/// Validation result for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowValidation {
    pub rule_violation: bool,
    /// Descriptions of the failed rules joined by `"; "`, empty when none failed.
    pub violation_justification: String,
}

/// Per-row results, aligned with the dataset rows.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub rows: Vec<RowValidation>,
    pub warnings: Vec<Warning>,
}

impl ValidationOutcome {
    pub fn violation_count(&self) -> usize {
        self.rows.iter().filter(|r| r.rule_violation).count()
    }
}

/// A rule with its columns resolved to positions.
enum Check {
    OneOf {
        position: usize,
        numbers: Vec<f64>,
        texts: Vec<String>,
    },
    Range {
        position: usize,
        min: Option<f64>,
        max: Option<f64>,
        min_inclusive: bool,
        max_inclusive: bool,
    },
    Pattern {
        position: usize,
        regex: Regex,
    },
    Compare {
        left: usize,
        op: CompareOp,
        right: usize,
    },
    Required {
        positions: Vec<usize>,
    },
}

struct CompiledRule<'a> {
    description: &'a str,
    check: Check,
}

/// Evaluates structured rules against every row of a dataset.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    options: MatchOptions,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Evaluate `rules` against `dataset`.
    ///
    /// Rules that cannot be checked against this dataset are skipped with an
    /// [`WarningKind::UnevaluableRule`] warning and never count as violations.
    pub fn validate(&self, dataset: &Dataset, rules: &[StructuredRule]) -> ValidationOutcome {
        let mut warnings = Vec::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for (index, rule) in rules.iter().enumerate() {
            match self.compile(dataset, rule) {
                Ok(check) => compiled.push(CompiledRule {
                    description: &rule.description,
                    check,
                }),
                Err(reason) => {
                    debug!(rule = %rule.description, %reason, "skipping rule");
                    warnings.push(
                        Warning::new(
                            Stage::Validated,
                            WarningKind::UnevaluableRule,
                            format!("Rule '{}' skipped: {}", rule.description, reason),
                        )
                        .for_rule(index),
                    );
                }
            }
        }

        let rows: Vec<RowValidation> = dataset
            .rows()
            .iter()
            .map(|row| {
                let mut failed: Vec<&str> = Vec::new();
                for rule in &compiled {
                    if !self.passes(&rule.check, row.values()) {
                        failed.push(rule.description);
                    }
                }
                RowValidation {
                    rule_violation: !failed.is_empty(),
                    violation_justification: failed.join("; "),
                }
            })
            .collect();

        let outcome = ValidationOutcome { rows, warnings };
        info!(
            rules = compiled.len(),
            skipped = outcome.warnings.len(),
            violations = outcome.violation_count(),
            "rules validated"
        );
        outcome
    }

    fn compile(&self, dataset: &Dataset, rule: &StructuredRule) -> Result<Check, String> {
        let schema = dataset.schema();
        match &rule.condition {
            Condition::OneOf { column, values } => {
                let position = resolve(schema, column)?;
                let numbers = values
                    .iter()
                    .filter_map(|v| v.trim().parse::<f64>().ok())
                    .filter(|n| n.is_finite())
                    .collect();
                let texts = values.iter().map(|v| self.options.normalize_text(v)).collect();
                Ok(Check::OneOf {
                    position,
                    numbers,
                    texts,
                })
            }
            Condition::Range {
                column,
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let position = resolve(schema, column)?;
                let numeric = schema.columns()[position].kind.is_numeric();
                let all_missing = dataset.column_values(position).all(Value::is_missing);
                if !numeric && !all_missing {
                    return Err(format!("column '{}' is not numeric", column));
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(format!("empty range [{}, {}]", lo, hi));
                    }
                }
                Ok(Check::Range {
                    position,
                    min: *min,
                    max: *max,
                    min_inclusive: *min_inclusive,
                    max_inclusive: *max_inclusive,
                })
            }
            Condition::Pattern { column, pattern } => {
                let position = resolve(schema, column)?;
                let regex = RegexBuilder::new(&format!("^(?:{})$", pattern))
                    .case_insensitive(!self.options.case_sensitive)
                    .build()
                    .map_err(|e| format!("invalid pattern: {}", e))?;
                Ok(Check::Pattern { position, regex })
            }
            Condition::Compare { left, op, right } => Ok(Check::Compare {
                left: resolve(schema, left)?,
                op: *op,
                right: resolve(schema, right)?,
            }),
            Condition::Required { columns } => {
                if columns.is_empty() {
                    return Err("no columns listed".to_string());
                }
                let positions = columns
                    .iter()
                    .map(|c| resolve(schema, c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Check::Required { positions })
            }
            Condition::Unevaluable { rule_kind, reason } => {
                Err(format!("unsupported rule kind '{}' ({})", rule_kind, reason))
            }
        }
    }

    fn passes(&self, check: &Check, cells: &[Value]) -> bool {
        let cell = |position: usize| cells.get(position).unwrap_or(&Value::Missing);
        let tolerance = self.options.numeric_tolerance;

        match check {
            Check::Required { positions } => positions.iter().all(|p| !cell(*p).is_missing()),
            Check::OneOf {
                position,
                numbers,
                texts,
            } => match cell(*position) {
                Value::Missing => true,
                Value::Number(n) => {
                    numbers.iter().any(|v| (v - n).abs() <= tolerance)
                        || texts.contains(&self.options.normalize_text(&cell_text(cell(*position))))
                }
                Value::Text(s) => texts.contains(&self.options.normalize_text(s)),
            },
            Check::Range {
                position,
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let Some(n) = cell(*position).as_number() else {
                    return true;
                };
                let above_min = match min {
                    Some(m) if *min_inclusive => n >= m - tolerance,
                    Some(m) => n > *m,
                    None => true,
                };
                let below_max = match max {
                    Some(m) if *max_inclusive => n <= m + tolerance,
                    Some(m) => n < *m,
                    None => true,
                };
                above_min && below_max
            }
            Check::Pattern { position, regex } => match cell(*position) {
                Value::Missing => true,
                value => {
                    let text = cell_text(value);
                    let text = if self.options.trim_whitespace {
                        text.trim()
                    } else {
                        text.as_str()
                    };
                    regex.is_match(text)
                }
            },
            Check::Compare { left, op, right } => {
                let (a, b) = (cell(*left), cell(*right));
                if a.is_missing() || b.is_missing() {
                    return true;
                }
                let ordering = match (a.as_number(), b.as_number()) {
                    (Some(x), Some(y)) if (x - y).abs() <= tolerance => Ordering::Equal,
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => self
                        .options
                        .normalize_text(&cell_text(a))
                        .cmp(&self.options.normalize_text(&cell_text(b))),
                };
                op.holds(ordering)
            }
        }
    }
}

fn resolve(schema: &Schema, column: &str) -> Result<usize, String> {
    schema
        .position(column)
        .or_else(|| {
            schema
                .columns()
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(column))
                .map(|c| c.position)
        })
        .ok_or_else(|| format!("unknown column '{}'", column))
}

fn cell_text(value: &Value) -> String {
    value.as_text().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::from_cells(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn positive(column: &str) -> StructuredRule {
        StructuredRule::new(
            format!("{} must be positive", column),
            Condition::Range {
                column: column.into(),
                min: Some(0.0),
                max: None,
                min_inclusive: false,
                max_inclusive: true,
            },
        )
    }

    #[test]
    fn test_negative_amount_violates() {
        let data = dataset(&["Amount"], &[&["10"], &["-5"], &["3"]]);
        let outcome = RuleValidator::new().validate(&data, &[positive("Amount")]);

        assert_eq!(outcome.rows.len(), 3);
        assert!(!outcome.rows[0].rule_violation);
        assert!(outcome.rows[1].rule_violation);
        assert_eq!(outcome.rows[1].violation_justification, "Amount must be positive");
        assert_eq!(outcome.rows[0].violation_justification, "");
        assert_eq!(outcome.violation_count(), 1);
    }

    #[test]
    fn test_justification_lists_failed_rules_in_order() {
        let data = dataset(&["Amount", "Status"], &[&["-1", "lost"]]);
        let rules = vec![
            positive("Amount"),
            StructuredRule::new(
                "Status must be open or closed",
                Condition::OneOf {
                    column: "Status".into(),
                    values: vec!["open".into(), "closed".into()],
                },
            ),
        ];
        let outcome = RuleValidator::new().validate(&data, &rules);
        assert_eq!(
            outcome.rows[0].violation_justification,
            "Amount must be positive; Status must be open or closed"
        );
    }

    #[test]
    fn test_rules_sharing_a_description_each_count() {
        let data = dataset(&["a", "b"], &[&["-1", "-1"], &["-1", "2"]]);
        let rule = |column: &str| {
            StructuredRule::new(
                "must be valid",
                Condition::Range {
                    column: column.into(),
                    min: Some(0.0),
                    max: None,
                    min_inclusive: false,
                    max_inclusive: true,
                },
            )
        };
        let outcome = RuleValidator::new().validate(&data, &[rule("a"), rule("b")]);

        assert_eq!(outcome.rows[0].violation_justification, "must be valid; must be valid");
        assert_eq!(outcome.rows[1].violation_justification, "must be valid");
    }

    #[test]
    fn test_missing_cells_fail_only_required() {
        let data = dataset(&["Amount", "Email"], &[&["", ""], &["5", "a@b.c"]]);
        let rules = vec![
            positive("Amount"),
            StructuredRule::new(
                "Email must look like an email",
                Condition::Pattern {
                    column: "Email".into(),
                    pattern: r"[^@\s]+@[^@\s]+\.[^@\s]+".into(),
                },
            ),
            StructuredRule::new(
                "Amount is required",
                Condition::Required {
                    columns: vec!["Amount".into()],
                },
            ),
        ];
        let outcome = RuleValidator::new().validate(&data, &rules);

        assert_eq!(outcome.rows[0].violation_justification, "Amount is required");
        assert!(!outcome.rows[1].rule_violation);
    }

    #[test]
    fn test_unknown_column_is_skipped_with_warning() {
        let data = dataset(&["Amount"], &[&["-5"]]);
        let outcome = RuleValidator::new().validate(&data, &[positive("Price")]);

        assert!(!outcome.rows[0].rule_violation);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::UnevaluableRule);
        assert_eq!(outcome.warnings[0].rule_index, Some(0));
    }

    #[test]
    fn test_bad_regex_and_unevaluable_are_skipped() {
        let data = dataset(&["Code"], &[&["x"]]);
        let rules = vec![
            StructuredRule::new(
                "bad",
                Condition::Pattern {
                    column: "Code".into(),
                    pattern: "(".into(),
                },
            ),
            StructuredRule::new(
                "unique codes",
                Condition::Unevaluable {
                    rule_kind: "unique".into(),
                    reason: "not supported".into(),
                },
            ),
        ];
        let outcome = RuleValidator::new().validate(&data, &rules);
        assert!(!outcome.rows[0].rule_violation);
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn test_range_on_text_column_is_skipped() {
        let data = dataset(&["Name"], &[&["bob"]]);
        let outcome = RuleValidator::new().validate(&data, &[positive("Name")]);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_one_of_numeric_and_case_options() {
        let data = dataset(&["Level", "Tier"], &[&["1", "Gold"], &["2.0", "gold"], &["3", "tin"]]);
        let rules = vec![
            StructuredRule::new(
                "Level in 1,2",
                Condition::OneOf {
                    column: "Level".into(),
                    values: vec!["1".into(), "2".into()],
                },
            ),
            StructuredRule::new(
                "Tier is Gold",
                Condition::OneOf {
                    column: "Tier".into(),
                    values: vec!["Gold".into()],
                },
            ),
        ];

        let strict = RuleValidator::new().validate(&data, &rules);
        assert_eq!(strict.rows[0].violation_justification, "");
        assert_eq!(strict.rows[1].violation_justification, "Tier is Gold");
        assert_eq!(
            strict.rows[2].violation_justification,
            "Level in 1,2; Tier is Gold"
        );

        let relaxed = RuleValidator::with_options(MatchOptions::default().with_case_sensitive(false))
            .validate(&data, &rules);
        assert!(!relaxed.rows[1].rule_violation);
    }

    #[test]
    fn test_compare_columns() {
        let data = dataset(
            &["start", "end"],
            &[&["1", "5"], &["9", "2"], &["", "2"], &["3", "3"]],
        );
        let rule = StructuredRule::new(
            "start before end",
            Condition::Compare {
                left: "start".into(),
                op: CompareOp::Lt,
                right: "end".into(),
            },
        );
        let outcome = RuleValidator::new().validate(&data, &[rule]);
        let flags: Vec<bool> = outcome.rows.iter().map(|r| r.rule_violation).collect();
        assert_eq!(flags, vec![false, true, false, true]);
    }

    #[test]
    fn test_compare_dates_as_text() {
        let data = dataset(&["from", "to"], &[&["2024-01-01", "2024-02-01"], &["2024-03-01", "2024-02-01"]]);
        let rule = StructuredRule::new(
            "from on or before to",
            Condition::Compare {
                left: "from".into(),
                op: CompareOp::Le,
                right: "to".into(),
            },
        );
        let outcome = RuleValidator::new().validate(&data, &[rule]);
        assert!(!outcome.rows[0].rule_violation);
        assert!(outcome.rows[1].rule_violation);
    }

    #[test]
    fn test_inclusive_bounds_use_tolerance() {
        let data = dataset(&["Score"], &[&["100.0000000001"], &["100.1"]]);
        let rule = StructuredRule::new(
            "Score at most 100",
            Condition::Range {
                column: "Score".into(),
                min: None,
                max: Some(100.0),
                min_inclusive: true,
                max_inclusive: true,
            },
        );
        let outcome = RuleValidator::new().validate(&data, &[rule]);
        assert!(!outcome.rows[0].rule_violation);
        assert!(outcome.rows[1].rule_violation);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let data = dataset(&["Amount"], &[&["-1"], &["2"], &[""]]);
        let rules = vec![positive("Amount")];
        let validator = RuleValidator::new();
        assert_eq!(
            validator.validate(&data, &rules).rows,
            validator.validate(&data, &rules).rows
        );
    }
}
