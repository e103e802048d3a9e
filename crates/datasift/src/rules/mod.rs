//! Business rules: interpretation of free text and evaluation against rows.

mod interpreter;
mod parse;
mod rule;
mod validator;

pub use interpreter::{Interpretation, RuleInterpreter};
pub use parse::{extract_json, parse_rules_response, ParsedRules};
pub use rule::{CompareOp, Condition, StructuredRule};
pub use validator::{MatchOptions, RowValidation, RuleValidator, ValidationOutcome};
