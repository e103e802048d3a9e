//! Client-facing view of a report: a table plus KPIs and serialized charts.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::builder::AnalysisReport;
use super::json;
use crate::error::Result;
use crate::warning::Warning;

/// Fields added to every data row. They take precedence over dataset
/// columns with the same name, and a shadowed dataset column is left out of
/// both `columns` and `data`.
pub const DERIVED_FIELDS: [&str; 5] = [
    "id",
    "rule_violation",
    "violation_justification",
    "anomaly_score",
    "is_anomaly",
];

/// Headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_records: usize,
    pub rule_violations_count: usize,
    pub anomalies_count: usize,
    pub anomaly_percentage: f64,
}

/// A chart with `data` and `layout` pre-serialized as JSON strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub data: String,
    pub layout: String,
}

/// Report retrieval shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    pub columns: Vec<String>,
    pub data: Vec<IndexMap<String, JsonValue>>,
    pub kpis: Kpis,
    pub visualizations: Vec<Visualization>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl AnalysisReport {
    pub fn kpis(&self) -> Kpis {
        Kpis {
            total_records: self.row_count,
            rule_violations_count: self.rule_violation_count,
            anomalies_count: self.anomaly_count,
            anomaly_percentage: self.anomaly_percentage,
        }
    }

    /// Flatten the report into the retrieval shape.
    pub fn to_view(&self) -> Result<ReportView> {
        let data = self
            .rows
            .iter()
            .map(|row| {
                let mut record = IndexMap::with_capacity(row.values.len() + DERIVED_FIELDS.len());
                record.insert("id".to_string(), JsonValue::from(row.id));
                for (name, value) in &row.values {
                    if !DERIVED_FIELDS.contains(&name.as_str()) {
                        record.insert(name.clone(), value.clone());
                    }
                }
                record.insert("rule_violation".to_string(), JsonValue::Bool(row.rule_violation));
                record.insert(
                    "violation_justification".to_string(),
                    JsonValue::String(row.violation_justification.clone()),
                );
                record.insert(
                    "anomaly_score".to_string(),
                    json::optional_number(row.anomaly_score),
                );
                record.insert("is_anomaly".to_string(), JsonValue::Bool(row.is_anomaly));
                record
            })
            .collect();

        let visualizations = self
            .charts
            .iter()
            .map(|chart| {
                Ok(Visualization {
                    data: serde_json::to_string(&json::normalize(chart.data.clone()))?,
                    layout: serde_json::to_string(&json::normalize(chart.layout.clone()))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.name.clone())
            .filter(|name| {
                let shadowed = DERIVED_FIELDS.contains(&name.as_str());
                if shadowed {
                    debug!(column = %name, "dataset column shadowed by a derived field");
                }
                !shadowed
            })
            .collect();

        Ok(ReportView {
            columns,
            data,
            kpis: self.kpis(),
            visualizations,
            summary: self.summary.clone(),
            warnings: self.warnings.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::anomaly::{AnomalyOutcome, RowAnomaly};
    use crate::input::Dataset;
    use crate::report::ReportBuilder;
    use crate::rules::{Interpretation, RowValidation, ValidationOutcome};
    use serde_json::json;

    #[test]
    fn test_view_shape() {
        let data = Dataset::from_cells(
            vec!["id".into(), "amount".into()],
            vec![vec!["x1".into(), "4".into()], vec!["x2".into(), "".into()]],
        )
        .unwrap();
        let validation = ValidationOutcome {
            rows: vec![RowValidation::default(), RowValidation::default()],
            warnings: Vec::new(),
        };
        let anomalies = AnomalyOutcome {
            rows: vec![
                RowAnomaly { anomaly_score: -0.45, is_anomaly: false },
                RowAnomaly { anomaly_score: -0.6, is_anomaly: true },
            ],
            column_summaries: Default::default(),
            threshold: Some(-0.5),
        };
        let report = ReportBuilder::new(&data)
            .build(Interpretation::default(), validation, anomalies)
            .unwrap();
        let view = report.to_view().unwrap();

        assert_eq!(view.columns, vec!["amount"]);
        assert_eq!(view.data[0]["id"], json!(1));
        assert_eq!(view.data[1]["amount"], json!(null));
        assert_eq!(view.data[1]["is_anomaly"], json!(true));
        assert_eq!(view.kpis.total_records, 2);
        assert_eq!(view.kpis.anomalies_count, 1);
        assert_eq!(view.visualizations.len(), 2);

        let chart: serde_json::Value = serde_json::from_str(&view.visualizations[0].data).unwrap();
        assert_eq!(chart[0]["type"], json!("box"));

        let encoded = serde_json::to_value(&view).unwrap();
        assert_eq!(
            encoded["summary"],
            json!("Analysis completed successfully. Found 0 rule violations and 1 anomalies in the dataset.")
        );
        assert!(encoded.get("warnings").is_none());
    }

    #[test]
    fn test_shadowed_columns_are_not_listed() {
        let data = Dataset::from_cells(
            vec!["is_anomaly".into(), "name".into()],
            vec![vec!["yes".into(), "a".into()]],
        )
        .unwrap();
        let validation = ValidationOutcome {
            rows: vec![RowValidation::default()],
            warnings: Vec::new(),
        };
        let report = ReportBuilder::new(&data)
            .build(Interpretation::default(), validation, AnomalyOutcome::empty())
            .unwrap();
        let view = report.to_view().unwrap();

        assert_eq!(view.columns, vec!["name"]);
        assert_eq!(view.data[0]["is_anomaly"], json!(false));
        for column in &view.columns {
            assert!(view.data[0].contains_key(column));
        }
    }
}
