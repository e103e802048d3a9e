//! Report assembly: counts, per-row results, charts and the client view.

mod builder;
mod charts;
pub mod json;
mod view;

pub use builder::{summary_sentence, AnalysisReport, DetectionSummary, ReportBuilder, RowResult};
pub use charts::{build_charts, ChartPayload};
pub use view::{Kpis, ReportView, Visualization, DERIVED_FIELDS};
