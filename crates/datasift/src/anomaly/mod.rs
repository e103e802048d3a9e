//! Anomaly detection over numeric columns.

mod detector;
mod forest;
mod stats;

pub use detector::{
    AnomalyDetector, AnomalyOutcome, DetectorConfig, RowAnomaly, DEFAULT_CONTAMINATION,
    DEFAULT_MAX_SAMPLES, DEFAULT_SEED, DEFAULT_TREES,
};
pub use forest::{average_path_length, IsolationForest};
pub use stats::ColumnSummary;
