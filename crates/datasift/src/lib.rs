//! datasift: rule-driven data quality analysis for tabular datasets.
//!
//! datasift takes a dataset and a table of business rules written in plain
//! language, and reports which rows break the rules and which rows are
//! statistical outliers.
//!
//! # Pipeline
//!
//! - **Interpret**: an interpretation service turns each rule sentence into a
//!   structured, machine-checkable rule
//! - **Validate**: every row is checked against every structured rule
//! - **Detect**: an isolation forest scores rows over the numeric columns
//! - **Report**: counts, per-row results, column summaries and chart payloads
//!
//! Interpretation failures never abort a run; they show up as report
//! warnings. The input dataset is never modified.
//!
//! # Example
//!
//! ```no_run
//! use datasift::{Analyzer, KeywordProvider};
//!
//! let analyzer = Analyzer::new().with_llm(KeywordProvider::new());
//! let report = analyzer.analyze_files("transactions.csv", "rules.csv").unwrap();
//!
//! println!("{}", report.summary);
//! for row in report.violating_rows() {
//!     println!("row {}: {}", row.id, row.violation_justification);
//! }
//! ```

pub mod anomaly;
pub mod error;
pub mod input;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod warning;

pub use anomaly::{AnomalyDetector, AnomalyOutcome, ColumnSummary, DetectorConfig, RowAnomaly};
pub use error::{DatasiftError, Fault, Result};
pub use input::{Dataset, Parser, ParserConfig, RawRule, RuleSet, SourceMetadata, Value};
pub use llm::{KeywordProvider, LlmConfig, LlmProvider, MockProvider, OllamaProvider, OpenAIProvider};
pub use pipeline::{Analyzer, AnalyzerConfig, PipelineRun, Stage};
pub use report::{AnalysisReport, ChartPayload, ReportView, RowResult};
pub use rules::{
    Condition, Interpretation, MatchOptions, RowValidation, RuleInterpreter, RuleValidator,
    StructuredRule, ValidationOutcome,
};
pub use warning::{Warning, WarningKind};
