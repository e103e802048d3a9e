//! Multivariate anomaly detection over the numeric columns of a dataset.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::forest::IsolationForest;
use super::stats::{median, quantile, ColumnSummary, RunningStats};
use crate::error::{DatasiftError, Result};
use crate::input::{Column, Dataset, Value};

pub const DEFAULT_CONTAMINATION: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TREES: usize = 100;
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Detector parameters.
///
/// Results are reproducible for a given seed. A different seed builds
/// different trees, so rows near the decision boundary may change label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Expected share of anomalous rows, in (0, 1).
    pub contamination: f64,
    pub seed: u64,
    pub n_trees: usize,
    /// Rows drawn per tree, capped at the row count.
    pub max_samples: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            seed: DEFAULT_SEED,
            n_trees: DEFAULT_TREES,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl DetectorConfig {
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(DatasiftError::InvalidInput(format!(
                "contamination must be between 0 and 1 (exclusive), got {}",
                self.contamination
            )));
        }
        if self.n_trees == 0 {
            return Err(DatasiftError::Config("n_trees must be at least 1".to_string()));
        }
        if self.max_samples == 0 {
            return Err(DatasiftError::Config(
                "max_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Detector output for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowAnomaly {
    /// Higher means more normal.
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

/// Detector output for a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyOutcome {
    /// One entry per dataset row, or empty when nothing was analyzed.
    pub rows: Vec<RowAnomaly>,
    /// Per numeric column, statistics over anomalous rows.
    pub column_summaries: IndexMap<String, Option<ColumnSummary>>,
    /// Score below which a row is flagged.
    pub threshold: Option<f64>,
}

impl AnomalyOutcome {
    /// The outcome when there was nothing to analyze.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the detector did not run.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn anomaly_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_anomaly).count()
    }

    pub fn get(&self, row: usize) -> Option<&RowAnomaly> {
        self.rows.get(row)
    }
}

/// Isolation-forest detector, built per run.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Score every row using the numeric columns of `dataset`.
    ///
    /// Without numeric columns or rows the result is [`AnomalyOutcome::empty`].
    /// Missing cells are replaced by the column median for scoring only.
    pub fn detect(&self, dataset: &Dataset) -> Result<AnomalyOutcome> {
        let features = dataset.numeric_columns();
        if features.is_empty() || dataset.is_empty() {
            debug!("no numeric columns; skipping anomaly detection");
            return Ok(AnomalyOutcome::empty());
        }

        let mut matrix = vec![Vec::with_capacity(features.len()); dataset.row_count()];
        for column in &features {
            let present: Vec<f64> = dataset
                .column_values(column.position)
                .filter_map(Value::as_number)
                .collect();
            let fill = median(&present).ok_or_else(|| {
                DatasiftError::Internal(format!("numeric column '{}' has no values", column.name))
            })?;
            for (row, value) in dataset.column_values(column.position).enumerate() {
                matrix[row].push(value.as_number().unwrap_or(fill));
            }
        }

        let forest = IsolationForest::fit(
            &matrix,
            self.config.n_trees,
            self.config.max_samples,
            self.config.seed,
        );
        let scores = forest.score_all(&matrix);
        let threshold = quantile(&scores, self.config.contamination).ok_or_else(|| {
            DatasiftError::Internal("no scores to derive a threshold from".to_string())
        })?;

        let rows: Vec<RowAnomaly> = scores
            .iter()
            .map(|&score| RowAnomaly {
                anomaly_score: score,
                is_anomaly: score < threshold,
            })
            .collect();

        let column_summaries = summarize_anomalous(dataset, &features, &rows);

        let outcome = AnomalyOutcome {
            rows,
            column_summaries,
            threshold: Some(threshold),
        };
        info!(
            features = features.len(),
            trees = forest.tree_count(),
            threshold,
            anomalies = outcome.anomaly_count(),
            "anomalies detected"
        );
        Ok(outcome)
    }
}

/// Per-column statistics over flagged rows. Absent cells are skipped; a column
/// with no flagged values, or a run with no flagged rows, maps to `None`.
fn summarize_anomalous(
    dataset: &Dataset,
    features: &[&Column],
    rows: &[RowAnomaly],
) -> IndexMap<String, Option<ColumnSummary>> {
    let anomalous = rows.iter().any(|r| r.is_anomaly);
    features
        .iter()
        .map(|column| {
            let summary = anomalous.then(|| {
                let mut stats = RunningStats::new();
                for (value, row) in dataset.column_values(column.position).zip(rows) {
                    if let (true, Some(n)) = (row.is_anomaly, value.as_number()) {
                        stats.add(n);
                    }
                }
                stats.summary()
            });
            (column.name.clone(), summary.flatten())
        })
        .collect()
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

    #[test]
    fn test_contamination_bounds() {
        for bad in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let config = DetectorConfig::default().with_contamination(bad);
            assert!(matches!(
                AnomalyDetector::new(config),
                Err(DatasiftError::InvalidInput(_))
            ));
        }
        assert!(AnomalyDetector::new(DetectorConfig::default().with_contamination(0.5)).is_ok());
    }

    #[test]
    fn test_no_numeric_columns_is_empty() {
        let data = dataset(&["name"], &[&["a"], &["b"]]);
        let outcome = AnomalyDetector::new(DetectorConfig::default())
            .unwrap()
            .detect(&data)
            .unwrap();
        assert!(outcome.is_empty());
        assert!(outcome.column_summaries.is_empty());
        assert_eq!(outcome.anomaly_count(), 0);
    }

    #[test]
    fn test_extreme_value_is_the_only_anomaly() {
        let data = dataset(&["id", "amount"], &[&["A", "10"], &["B", "1000"], &["C", "12"]]);
        let detector =
            AnomalyDetector::new(DetectorConfig::default().with_contamination(0.2)).unwrap();
        let outcome = detector.detect(&data).unwrap();

        let flags: Vec<bool> = outcome.rows.iter().map(|r| r.is_anomaly).collect();
        assert_eq!(flags, vec![false, true, false]);

        let summary = outcome.column_summaries["amount"].unwrap();
        assert_eq!(summary.mean, 1000.0);
        assert_eq!(summary.std, None);
    }

    #[test]
    fn test_summary_over_flagged_rows_only() {
        let mut rows: Vec<Vec<String>> = (0..40).map(|i| vec![format!("{}", 50 + i % 3)]).collect();
        rows.push(vec!["1".to_string()]);
        rows.push(vec!["".to_string()]);
        rows.push(vec!["3".to_string()]);
        let data = Dataset::from_cells(vec!["x".to_string()], rows).unwrap();

        let detector =
            AnomalyDetector::new(DetectorConfig::default().with_contamination(0.05)).unwrap();
        let outcome = detector.detect(&data).unwrap();

        assert_eq!(outcome.rows.len(), 43);
        assert!(outcome.rows[40].is_anomaly);
        assert!(outcome.rows[42].is_anomaly);
        let summary = outcome.column_summaries["x"].unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, 2.0);
    }

    #[test]
    fn test_absent_cell_in_flagged_row_is_skipped() {
        let data = dataset(&["x", "y"], &[&["1", "5"], &["", "6"], &["3", "7"], &["40", "8"]]);
        let flagged = |is_anomaly| RowAnomaly {
            anomaly_score: -0.7,
            is_anomaly,
        };
        let rows = vec![flagged(true), flagged(true), flagged(true), flagged(false)];

        let summaries = summarize_anomalous(&data, &data.numeric_columns(), &rows);

        let x = summaries["x"].unwrap();
        assert_eq!(x.count, 2);
        assert_eq!(x.mean, 2.0);
        assert_eq!(x.min, 1.0);
        assert_eq!(x.max, 3.0);
        let y = summaries["y"].unwrap();
        assert_eq!(y.count, 3);
        assert_eq!(y.mean, 6.0);
    }

    #[test]
    fn test_no_flagged_rows_gives_no_summaries() {
        let data = dataset(&["x"], &[&["1"], &["2"]]);
        let rows = vec![
            RowAnomaly {
                anomaly_score: -0.4,
                is_anomaly: false,
            };
            2
        ];
        let summaries = summarize_anomalous(&data, &data.numeric_columns(), &rows);
        assert_eq!(summaries["x"], None);
    }

    #[test]
    fn test_reproducible_for_same_seed() {
        let rows: Vec<Vec<String>> = (0..60)
            .map(|i| vec![format!("{}", (i * 37) % 101), format!("{}", (i * 11) % 7)])
            .collect();
        let data = Dataset::from_cells(vec!["a".into(), "b".into()], rows).unwrap();

        let detector = AnomalyDetector::new(DetectorConfig::default().with_seed(7)).unwrap();
        assert_eq!(detector.detect(&data).unwrap(), detector.detect(&data).unwrap());
    }

    #[test]
    fn test_count_matches_flags_and_rows_align() {
        let rows: Vec<Vec<String>> = (0..25).map(|i| vec![format!("{}", i * i)]).collect();
        let data = Dataset::from_cells(vec!["sq".into()], rows).unwrap();
        let outcome = AnomalyDetector::new(DetectorConfig::default())
            .unwrap()
            .detect(&data)
            .unwrap();

        assert_eq!(outcome.rows.len(), data.row_count());
        assert!(outcome.anomaly_count() > 0);
        assert!(outcome
            .rows
            .iter()
            .all(|r| r.is_anomaly == (r.anomaly_score < outcome.threshold.unwrap())));
    }
}
