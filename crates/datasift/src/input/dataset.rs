//! Typed in-memory table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{DatasiftError, Result};
use crate::report::json;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A finite number in a numeric column.
    Number(f64),
    /// Text in a categorical column.
    Text(String),
    /// The cell was empty or held a null marker.
    Missing,
}

impl Value {
    /// Returns the number if this cell holds one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for the absent marker.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Text form of a present cell. Integral numbers render without a fraction.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Number(n) => Some(json::format_number(*n)),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }

    /// JSON form of the cell; missing becomes `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Number(n) => json::number(*n),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Missing => JsonValue::Null,
        }
    }
}

/// Inferred type of a column, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub position: usize,
}

/// Ordered column declarations plus a name index.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<Column>,
    index: IndexMap<String, usize>,
}

impl Schema {
    fn new(columns: Vec<Column>) -> Self {
        let index = columns
            .iter()
            .map(|c| (c.name.clone(), c.position))
            .collect();
        Self { columns, index }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row, positionally aligned with the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn get(&self, position: usize) -> &Value {
        self.0.get(position).unwrap_or(&Value::Missing)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

/// Upload acknowledgment shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub preview: Vec<IndexMap<String, JsonValue>>,
}

/// A typed table. Treated as immutable input for the whole run.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from raw header and cell text.
    ///
    /// Column kinds are inferred here, once: a column is numeric when it has
    /// at least one present cell and every present cell is a finite number.
    pub fn from_cells(headers: Vec<String>, cells: Vec<Vec<String>>) -> Result<Self> {
        if headers.is_empty() {
            return Err(DatasiftError::EmptyData("No columns found".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for (i, name) in headers.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(DatasiftError::InvalidInput(format!(
                    "Column {} has an empty name",
                    i + 1
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(DatasiftError::InvalidInput(format!(
                    "Duplicate column name '{}'",
                    name
                )));
            }
        }

        let width = headers.len();
        let kinds: Vec<ColumnKind> = (0..width)
            .map(|col| infer_kind(cells.iter().map(|r| r.get(col).map(String::as_str).unwrap_or(""))))
            .collect();

        let rows = cells
            .into_iter()
            .map(|raw| {
                Row((0..width)
                    .map(|col| {
                        let text = raw.get(col).map(String::as_str).unwrap_or("");
                        to_value(text, kinds[col])
                    })
                    .collect())
            })
            .collect();

        let columns = headers
            .into_iter()
            .zip(kinds)
            .enumerate()
            .map(|(position, (name, kind))| Column {
                name,
                kind,
                position,
            })
            .collect();

        Ok(Self {
            schema: Schema::new(columns),
            rows,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Numeric columns in schema order.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.schema
            .columns()
            .iter()
            .filter(|c| c.kind.is_numeric())
            .collect()
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, position: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| row.get(position))
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let position = self.schema.position(column)?;
        self.rows.get(row).map(|r| r.get(position))
    }

    /// Row as an ordered JSON object, absent values as `null`.
    pub fn row_json(&self, row: usize) -> IndexMap<String, JsonValue> {
        let mut map = IndexMap::with_capacity(self.column_count());
        if let Some(r) = self.rows.get(row) {
            for column in self.schema.columns() {
                map.insert(column.name.clone(), r.get(column.position).to_json());
            }
        }
        map
    }

    /// Column names, row count and the first `preview_rows` rows.
    pub fn upload_summary(&self, preview_rows: usize) -> UploadSummary {
        UploadSummary {
            columns: self.schema.names().map(str::to_string).collect(),
            row_count: self.row_count(),
            preview: (0..self.row_count().min(preview_rows))
                .map(|i| self.row_json(i))
                .collect(),
        }
    }

    /// Check if a raw cell represents a missing/null value.
    pub fn is_null_value(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("nil")
            || trimmed == "."
            || trimmed == "-"
    }
}

fn parse_finite(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut present = 0usize;
    for value in values {
        if Dataset::is_null_value(value) {
            continue;
        }
        if parse_finite(value).is_none() {
            return ColumnKind::Categorical;
        }
        present += 1;
    }
    if present > 0 {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

fn to_value(text: &str, kind: ColumnKind) -> Value {
    if Dataset::is_null_value(text) {
        return Value::Missing;
    }
    match kind {
        ColumnKind::Numeric => parse_finite(text).map(Value::Number).unwrap_or(Value::Missing),
        ColumnKind::Categorical => Value::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(rows: Vec<Vec<&str>>) -> Vec<Vec<String>> {
        rows.into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_kind_inference() {
        let ds = Dataset::from_cells(
            vec!["id".into(), "amount".into(), "empty".into()],
            cells(vec![vec!["A", "10", ""], vec!["B", "NA", "NA"], vec!["C", "1.5", ""]]),
        )
        .unwrap();

        let kinds: Vec<_> = ds.schema().columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Categorical, ColumnKind::Numeric, ColumnKind::Categorical]
        );
        assert_eq!(ds.get(1, "amount"), Some(&Value::Missing));
        assert_eq!(ds.get(2, "amount"), Some(&Value::Number(1.5)));
    }

    #[test]
    fn test_mixed_column_is_categorical() {
        let ds = Dataset::from_cells(
            vec!["code".into()],
            cells(vec![vec!["1"], vec!["x2"], vec!["3"]]),
        )
        .unwrap();
        assert_eq!(ds.schema().columns()[0].kind, ColumnKind::Categorical);
        assert_eq!(ds.get(0, "code"), Some(&Value::Text("1".into())));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = Dataset::from_cells(vec!["a".into(), "a".into()], vec![]).unwrap_err();
        assert!(matches!(err, DatasiftError::InvalidInput(_)));
    }

    #[test]
    fn test_upload_summary_preview() {
        let ds = Dataset::from_cells(
            vec!["name".into(), "score".into()],
            cells((0..8).map(|_| vec!["x", ""]).collect()),
        )
        .unwrap();
        let summary = ds.upload_summary(5);
        assert_eq!(summary.row_count, 8);
        assert_eq!(summary.preview.len(), 5);
        assert_eq!(summary.preview[0]["score"], JsonValue::Null);
    }

    #[test]
    fn test_is_null_value() {
        assert!(Dataset::is_null_value(""));
        assert!(Dataset::is_null_value("NA"));
        assert!(Dataset::is_null_value("NaN"));
        assert!(Dataset::is_null_value("null"));
        assert!(Dataset::is_null_value("."));
        assert!(!Dataset::is_null_value("0"));
        assert!(!Dataset::is_null_value("value"));
    }
}
