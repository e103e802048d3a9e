//! Prompt templates for rule interpretation.

use serde_json::json;

use crate::input::RawRule;

/// System prompt shared by chat-style providers.
pub fn system_prompt() -> &'static str {
    "You are a data validation expert. You turn plain-language data quality rules \
     into precise, machine-checkable conditions. You answer with JSON only."
}

/// Build the prompt asking for structured rules.
pub fn interpretation_prompt(rules: &[RawRule], columns: &[String]) -> String {
    let rules_json: Vec<_> = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| json!({ "rule_index": i, "fields": rule.fields() }))
        .collect();
    let rules_str = serde_json::to_string_pretty(&rules_json)
        .unwrap_or_else(|_| "Unable to serialize rules".to_string());

    let columns_str = if columns.is_empty() {
        "Unknown".to_string()
    } else {
        columns
            .iter()
            .map(|c| format!("  - \"{}\"", c))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Analyze these data validation rules and convert them into a structured format.

## Dataset Columns
{columns_str}

## Rules
{rules_str}

## Task
For each rule, provide:
1. The condition to check (one of the kinds below)
2. The columns involved, spelled exactly as in the dataset columns
3. The expected format or values

Kinds:
- "one_of": the column must equal one of the values. expected: ["A", "B"]
- "range": the numeric column must be within bounds.
  expected: {{"min": number|null, "max": number|null, "min_inclusive": bool, "max_inclusive": bool}}
- "pattern": the column must fully match a regular expression. expected: "regex"
- "compare": columns[0] relates to columns[1]. expected: "lt"|"le"|"gt"|"ge"|"eq"|"ne"
- "required": every listed column must have a value. expected: null

If a rule fits none of these kinds, still return it with "kind": "unsupported".

Respond with a JSON array, one object per rule:
[
  {{
    "rule_index": 0,
    "kind": "range",
    "columns": ["Amount"],
    "expected": {{"min": 0, "max": null, "min_inclusive": false, "max_inclusive": true}},
    "description": "Amount must be positive"
  }}
]"#
    )
}
