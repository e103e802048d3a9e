//! Soft failures collected while a run continues.

use serde::{Deserialize, Serialize};

use crate::pipeline::Stage;

/// What degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The interpretation service was missing, unreachable or timed out.
    InterpreterUnavailable,
    /// The service answered with text that could not be parsed into rules.
    UnparsableResponse,
    /// One entry of an otherwise readable answer was malformed and dropped.
    MalformedEntry,
    /// A raw rule got no interpretation at all.
    RuleNotInterpreted,
    /// A structured rule could not be evaluated against the dataset.
    UnevaluableRule,
}

/// A warning attached to the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub stage: Stage,
    pub kind: WarningKind,
    /// Index of the affected rule, when the warning concerns one rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<usize>,
    pub message: String,
}

impl Warning {
    pub fn new(stage: Stage, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            rule_index: None,
            message: message.into(),
        }
    }

    pub fn for_rule(mut self, index: usize) -> Self {
        self.rule_index = Some(index);
        self
    }
}
