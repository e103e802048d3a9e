//! Offline provider that reads common rule phrasings.
//!
//! Works without any network service. It recognizes sentences such as
//! "Amount must be positive", "CustomerID must not be empty",
//! "Country must be one of US, CA" or "start_date must be before end_date",
//! and answers in the same JSON format the chat providers are asked for.
//! Anything it does not recognize comes back as `"kind": "unsupported"`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Result;
use crate::input::RawRule;

use super::provider::{LlmConfig, LlmProvider};

static SUBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:the\s+)?(?P<col>.+?)\s+(?:must|should|shall|has\s+to|needs\s+to)\s+(?P<neg>not\s+)?(?P<rest>.+?)\s*\.?\s*$",
    )
    .unwrap()
});

static IS_REQUIRED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:the\s+)?(?P<col>.+?)\s+is\s+(?:required|mandatory)\s*\.?\s*$").unwrap()
});

static EMPTY_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^be\s+(?:empty|null|blank|missing|left\s+blank)$").unwrap()
});

static PRESENT_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:be\s+(?:present|provided|populated|filled(?:\s+in)?|non[- ]?empty|not\s+null|required|mandatory)|exist)$",
    )
    .unwrap()
});

static SIGN_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^be\s+(?P<sign>positive|negative|non[- ]?negative|non[- ]?positive)(?:\s+numbers?)?$")
        .unwrap()
});

static BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^be\s+between\s+(?P<a>\S+)\s+and\s+(?P<b>\S+?)(?:\s*\(?inclusive\)?)?$").unwrap()
});

static RELATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^be\s+(?P<op>greater\s+than\s+or\s+equal\s+to|less\s+than\s+or\s+equal\s+to|greater\s+than|more\s+than|less\s+than|smaller\s+than|at\s+least|at\s+most|equal\s+to|the\s+same\s+as|different\s+from|before|after|>=|<=|>|<|==|=|!=)\s+(?P<target>.+)$",
    )
    .unwrap()
});

static ONE_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^be\s+(?:one\s+of|in|either|any\s+of)\s*:?\s*(?P<list>.+)$").unwrap()
});

static MATCHES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:match(?:es)?|follow)\s+(?:the\s+)?(?:pattern|regex|regular\s+expression|format)?\s*:?\s*(?P<re>.+)$")
        .unwrap()
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^be\s+(?:an?\s+)?(?:valid\s+)?e-?mail(?:\s+address)?$").unwrap()
});

static NUMERIC_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^be\s+(?:an?\s+)?(?:valid\s+)?(?:number|numeric|integer)$").unwrap()
});

static LIST_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*(?:,|/|;|\bor\b|\band\b)\s*").unwrap());

const EMAIL_PATTERN: &str = r"[^@\s]+@[^@\s]+\.[^@\s]+";
const INTEGER_PATTERN: &str = r"-?\d+";
const NUMBER_PATTERN: &str = r"-?\d+(?:\.\d+)?";

/// Deterministic, offline rule reader.
pub struct KeywordProvider {
    config: LlmConfig,
}

impl KeywordProvider {
    pub fn new() -> Self {
        Self {
            config: LlmConfig::default().with_model("keyword"),
        }
    }

    /// Read one rule into a response entry (without `rule_index`).
    pub fn read_rule(rule: &RawRule, columns: &[String]) -> Value {
        let description = rule.description().unwrap_or_default();
        let text = rule.field("condition").unwrap_or(description);
        let column_field = rule.field("column");

        let mut entry = read_sentence(text, column_field, columns);
        if let Value::Object(map) = &mut entry {
            map.insert("description".to_string(), json!(description));
        }
        entry
    }
}

impl Default for KeywordProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for KeywordProvider {
    fn interpret_rules(&self, rules: &[RawRule], columns: &[String]) -> Result<String> {
        let entries: Vec<Value> = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let mut entry = Self::read_rule(rule, columns);
                if let Value::Object(map) = &mut entry {
                    map.insert("rule_index".to_string(), json!(i));
                }
                entry
            })
            .collect();
        debug!(rules = entries.len(), "read rules offline");
        Ok(serde_json::to_string(&entries)?)
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Resolve a column mention against the dataset, ignoring case and quotes.
fn resolve_column(mention: &str, columns: &[String]) -> String {
    let cleaned = strip_quotes(mention.trim());
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(cleaned))
        .cloned()
        .unwrap_or_else(|| cleaned.to_string())
}

fn known_column(mention: &str, columns: &[String]) -> Option<String> {
    let cleaned = strip_quotes(mention.trim());
    columns.iter().find(|c| c.eq_ignore_ascii_case(cleaned)).cloned()
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('`', '`'), ('/', '/'), ('[', ']'), ('(', ')')] {
        if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
            return &text[open.len_utf8()..text.len() - close.len_utf8()];
        }
    }
    text
}

fn parse_number(text: &str) -> Option<f64> {
    strip_quotes(text)
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn unsupported(columns: Vec<String>) -> Value {
    json!({ "kind": "unsupported", "columns": columns, "expected": null })
}

fn range(column: String, min: Option<f64>, max: Option<f64>, min_inclusive: bool, max_inclusive: bool) -> Value {
    json!({
        "kind": "range",
        "columns": [column],
        "expected": {
            "min": min,
            "max": max,
            "min_inclusive": min_inclusive,
            "max_inclusive": max_inclusive,
        }
    })
}

fn read_sentence(text: &str, column_field: Option<&str>, columns: &[String]) -> Value {
    if let Some(caps) = IS_REQUIRED.captures(text) {
        let column = resolve_column(column_field.unwrap_or(&caps["col"]), columns);
        return json!({ "kind": "required", "columns": [column], "expected": null });
    }

    let Some(caps) = SUBJECT.captures(text) else {
        return unsupported(column_field.map(|c| resolve_column(c, columns)).into_iter().collect());
    };

    let column = resolve_column(column_field.unwrap_or(&caps["col"]), columns);
    let negated = caps.name("neg").is_some();
    let rest = caps["rest"].trim();

    if negated {
        if EMPTY_WORD.is_match(rest) {
            return json!({ "kind": "required", "columns": [column], "expected": null });
        }
        if let Some(sign) = SIGN_WORD.captures(rest) {
            return match sign["sign"].to_ascii_lowercase().as_str() {
                "negative" => range(column, Some(0.0), None, true, true),
                "positive" => range(column, None, Some(0.0), true, true),
                _ => unsupported(vec![column]),
            };
        }
        return unsupported(vec![column]);
    }

    if PRESENT_WORD.is_match(rest) {
        return json!({ "kind": "required", "columns": [column], "expected": null });
    }

    if let Some(sign) = SIGN_WORD.captures(rest) {
        let sign = sign["sign"].to_ascii_lowercase().replace([' ', '-'], "");
        return match sign.as_str() {
            "positive" => range(column, Some(0.0), None, false, true),
            "negative" => range(column, None, Some(0.0), true, false),
            "nonnegative" => range(column, Some(0.0), None, true, true),
            _ => range(column, None, Some(0.0), true, true),
        };
    }

    if let Some(between) = BETWEEN.captures(rest) {
        if let (Some(a), Some(b)) = (parse_number(&between["a"]), parse_number(&between["b"])) {
            return range(column, Some(a.min(b)), Some(a.max(b)), true, true);
        }
    }

    if EMAIL.is_match(rest) {
        return json!({ "kind": "pattern", "columns": [column], "expected": EMAIL_PATTERN });
    }

    if NUMERIC_WORD.is_match(rest) {
        let pattern = if rest.to_ascii_lowercase().ends_with("integer") {
            INTEGER_PATTERN
        } else {
            NUMBER_PATTERN
        };
        return json!({ "kind": "pattern", "columns": [column], "expected": pattern });
    }

    if let Some(relation) = RELATION.captures(rest) {
        return read_relation(column, &relation["op"], relation["target"].trim(), columns);
    }

    if let Some(list) = ONE_OF.captures(rest) {
        let values: Vec<String> = LIST_SPLIT
            .split(strip_quotes(list["list"].trim()))
            .map(|v| strip_quotes(v.trim()).to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            return json!({ "kind": "one_of", "columns": [column], "expected": values });
        }
    }

    if let Some(pattern) = MATCHES.captures(rest) {
        let re = strip_quotes(pattern["re"].trim());
        if !re.is_empty() {
            return json!({ "kind": "pattern", "columns": [column], "expected": re });
        }
    }

    unsupported(vec![column])
}

fn read_relation(column: String, op_text: &str, target: &str, columns: &[String]) -> Value {
    let op_key = op_text.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    let op = match op_key.as_str() {
        "greater than or equal to" | "at least" | ">=" => "ge",
        "less than or equal to" | "at most" | "<=" => "le",
        "greater than" | "more than" | "after" | ">" => "gt",
        "less than" | "smaller than" | "before" | "<" => "lt",
        "equal to" | "the same as" | "=" | "==" => "eq",
        _ => "ne",
    };

    if let Some(other) = known_column(target, columns) {
        return json!({ "kind": "compare", "columns": [column, other], "expected": op });
    }

    if let Some(n) = parse_number(target) {
        return match op {
            "ge" => range(column, Some(n), None, true, true),
            "gt" => range(column, Some(n), None, false, true),
            "le" => range(column, None, Some(n), true, true),
            "lt" => range(column, None, Some(n), true, false),
            "eq" => json!({ "kind": "one_of", "columns": [column], "expected": [strip_quotes(target)] }),
            _ => unsupported(vec![column]),
        };
    }

    if op == "eq" {
        return json!({ "kind": "one_of", "columns": [column], "expected": [strip_quotes(target)] });
    }

    // A comparison against something that is neither a number nor a known
    // column: keep it as a comparison so the validator reports the unknown column.
    json!({ "kind": "compare", "columns": [column, strip_quotes(target)], "expected": op })
}
