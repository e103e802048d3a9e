//! Dataset and rules ingestion.

mod dataset;
mod parser;
mod rules;
mod source;

pub use dataset::{Column, ColumnKind, Dataset, Row, Schema, UploadSummary, Value};
pub use parser::{Parser, ParserConfig};
pub use rules::{RawRule, RuleSet, DESCRIPTION_FIELD};
pub use source::SourceMetadata;
