//! Assembly of the final report from the stage outcomes.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::charts::{build_charts, ChartPayload};
use super::json;
use crate::anomaly::{AnomalyOutcome, ColumnSummary, DetectorConfig};
use crate::error::{DatasiftError, Result};
use crate::input::{Column, Dataset, SourceMetadata};
use crate::rules::{Interpretation, StructuredRule, ValidationOutcome};
use crate::warning::Warning;

/// Combined result for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    /// 1-based row identifier.
    pub id: usize,
    /// Original cell values, absent values as `null`.
    pub values: IndexMap<String, JsonValue>,
    pub rule_violation: bool,
    pub violation_justification: String,
    /// `None` when the detector did not run.
    pub anomaly_score: Option<f64>,
    pub is_anomaly: bool,
}

/// Parameters the detector ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub contamination: f64,
    pub seed: u64,
    /// Numeric columns fed to the detector.
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Result of one analysis run. Built once and never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,
    pub row_count: usize,
    pub rule_violation_count: usize,
    pub anomaly_count: usize,
    /// Share of anomalous rows, in percent.
    pub anomaly_percentage: f64,
    pub columns: Vec<Column>,
    /// Structured rules that were applied or attempted.
    pub rules: Vec<StructuredRule>,
    pub rows: Vec<RowResult>,
    pub column_summaries: IndexMap<String, Option<ColumnSummary>>,
    pub charts: Vec<ChartPayload>,
    pub summary: String,
    pub warnings: Vec<Warning>,
    pub detection: DetectionSummary,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// The report as a JSON tree with non-finite numbers as `null`.
    pub fn to_json(&self) -> Result<JsonValue> {
        json::to_value(self)
    }

    pub fn violating_rows(&self) -> impl Iterator<Item = &RowResult> {
        self.rows.iter().filter(|r| r.rule_violation)
    }

    pub fn anomalous_rows(&self) -> impl Iterator<Item = &RowResult> {
        self.rows.iter().filter(|r| r.is_anomaly)
    }
}

/// The human-readable summary line.
pub fn summary_sentence(violations: usize, anomalies: usize) -> String {
    format!(
        "Analysis completed successfully. Found {} rule violations and {} anomalies in the dataset.",
        violations, anomalies
    )
}

/// Combines stage outcomes into an [`AnalysisReport`].
pub struct ReportBuilder<'a> {
    dataset: &'a Dataset,
    source: Option<SourceMetadata>,
    detector: DetectorConfig,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            source: None,
            detector: DetectorConfig::default(),
        }
    }

    pub fn with_source(mut self, source: Option<SourceMetadata>) -> Self {
        self.source = source;
        self
    }

    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.detector = config;
        self
    }

    /// Build the report.
    ///
    /// Fails only when the stage outcomes are not aligned with the dataset rows.
    pub fn build(
        self,
        interpretation: Interpretation,
        validation: ValidationOutcome,
        anomalies: AnomalyOutcome,
    ) -> Result<AnalysisReport> {
        let row_count = self.dataset.row_count();
        if validation.rows.len() != row_count {
            return Err(DatasiftError::Internal(format!(
                "validation produced {} results for {} rows",
                validation.rows.len(),
                row_count
            )));
        }
        if !anomalies.is_empty() && anomalies.rows.len() != row_count {
            return Err(DatasiftError::Internal(format!(
                "anomaly detection produced {} results for {} rows",
                anomalies.rows.len(),
                row_count
            )));
        }

        let rows: Vec<RowResult> = validation
            .rows
            .into_iter()
            .enumerate()
            .map(|(row, checked)| {
                let anomaly = anomalies.get(row);
                RowResult {
                    id: row + 1,
                    values: self.dataset.row_json(row),
                    rule_violation: checked.rule_violation,
                    violation_justification: checked.violation_justification,
                    anomaly_score: anomaly.map(|a| a.anomaly_score),
                    is_anomaly: anomaly.is_some_and(|a| a.is_anomaly),
                }
            })
            .collect();

        let rule_violation_count = rows.iter().filter(|r| r.rule_violation).count();
        let anomaly_count = rows.iter().filter(|r| r.is_anomaly).count();
        let anomaly_percentage = if row_count == 0 {
            0.0
        } else {
            anomaly_count as f64 / row_count as f64 * 100.0
        };

        let charts = build_charts(self.dataset, &anomalies);
        let mut warnings = interpretation.warnings;
        warnings.extend(validation.warnings);

        debug!(
            rows = row_count,
            violations = rule_violation_count,
            anomalies = anomaly_count,
            charts = charts.len(),
            "report built"
        );

        Ok(AnalysisReport {
            source: self.source,
            row_count,
            rule_violation_count,
            anomaly_count,
            anomaly_percentage,
            columns: self.dataset.schema().columns().to_vec(),
            rules: interpretation.rules,
            rows,
            detection: DetectionSummary {
                contamination: self.detector.contamination,
                seed: self.detector.seed,
                features: anomalies.column_summaries.keys().cloned().collect(),
                threshold: anomalies.threshold,
            },
            column_summaries: anomalies.column_summaries,
            charts,
            summary: summary_sentence(rule_violation_count, anomaly_count),
            warnings,
            generated_at: Utc::now(),
        })
    }
}
