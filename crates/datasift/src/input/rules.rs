//! Rules table ingestion.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::dataset::Dataset;
use super::parser::{Parser, ParserConfig};
use crate::error::{DatasiftError, Result};

/// Column every rules table must carry.
pub const DESCRIPTION_FIELD: &str = "description";

/// One row of the uploaded rules table, field name to value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRule {
    fields: IndexMap<String, Option<String>>,
}

impl RawRule {
    /// Build a rule from ordered fields.
    pub fn from_fields(fields: IndexMap<String, Option<String>>) -> Self {
        Self { fields }
    }

    /// Shorthand for a rule that only has a description.
    pub fn with_description(description: impl Into<String>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(DESCRIPTION_FIELD.to_string(), Some(description.into()));
        Self { fields }
    }

    /// The description field, matched case-insensitively.
    pub fn description(&self) -> Option<&str> {
        self.field(DESCRIPTION_FIELD)
    }

    /// Any field by name, matched case-insensitively; blank values read as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn fields(&self) -> &IndexMap<String, Option<String>> {
        &self.fields
    }
}

/// Parsed rules table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<RawRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<RawRule>) -> Self {
        Self { rules }
    }

    /// Parse a rules table from text.
    pub fn parse_str(text: &str) -> Result<Self> {
        Self::parse_bytes(text.as_bytes(), &ParserConfig::default())
    }

    /// Parse a rules table from a file.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| DatasiftError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse_bytes(&contents, &ParserConfig::default())
    }

    /// Parse with an explicit parser configuration.
    ///
    /// Requires a `description` column. Rows without a description are dropped
    /// with a warning; a table left with no rules is an input error.
    pub fn parse_bytes(bytes: &[u8], config: &ParserConfig) -> Result<Self> {
        let raw = Parser::with_config(config.clone()).read_table(bytes)?;

        if !raw
            .headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(DESCRIPTION_FIELD))
        {
            return Err(DatasiftError::InvalidInput(format!(
                "Rules table must have a '{}' column (found: {})",
                DESCRIPTION_FIELD,
                raw.headers.join(", ")
            )));
        }

        let mut rules = Vec::with_capacity(raw.rows.len());
        for (idx, row) in raw.rows.into_iter().enumerate() {
            let fields: IndexMap<String, Option<String>> = raw
                .headers
                .iter()
                .cloned()
                .zip(row.into_iter().map(|cell| {
                    if Dataset::is_null_value(&cell) {
                        None
                    } else {
                        Some(cell)
                    }
                }))
                .collect();
            let rule = RawRule::from_fields(fields);

            if rule.description().is_none() {
                warn!(row = idx + 1, "dropping rule without a description");
                continue;
            }
            rules.push(rule);
        }

        if rules.is_empty() {
            return Err(DatasiftError::EmptyData(
                "Rules table contains no rules".to_string(),
            ));
        }

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules_table() {
        let rules = RuleSet::parse_str(
            "name,Description\npositive,Amount must be positive\nid,CustomerID must not be empty\n",
        )
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules[0].description(), Some("Amount must be positive"));
        assert_eq!(rules.rules[1].field("name"), Some("id"));
    }

    #[test]
    fn test_missing_description_column() {
        let err = RuleSet::parse_str("name,condition\na,b\n").unwrap_err();
        assert!(matches!(err, DatasiftError::InvalidInput(_)));
    }

    #[test]
    fn test_blank_description_dropped() {
        let rules = RuleSet::parse_str("name,description\na,\nb,Amount must be positive\n").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules[0].field("name"), Some("b"));
    }

    #[test]
    fn test_unquoted_commas_in_description_rejected() {
        let err = RuleSet::parse_str("description\nAmount must be one of 1, 2, 3\n").unwrap_err();
        assert!(matches!(err, DatasiftError::InvalidInput(_)));
        assert_eq!(err.fault(), crate::error::Fault::Client);

        let quoted = RuleSet::parse_str("description\n\"Amount must be one of 1, 2, 3\"\n").unwrap();
        assert_eq!(quoted.rules[0].description(), Some("Amount must be one of 1, 2, 3"));
    }

    #[test]
    fn test_no_rules_is_error() {
        let err = RuleSet::parse_str("description\n").unwrap_err();
        assert!(matches!(err, DatasiftError::EmptyData(_)));
    }

    #[test]
    fn test_raw_rule_serializes_as_mapping() {
        let rule = RawRule::with_description("x must be positive");
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["description"], "x must be positive");
    }
}
