//! Delimited-text parser with delimiter detection.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::dataset::Dataset;
use super::source::SourceMetadata;
use crate::error::{DatasiftError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Header plus raw cell text, before any typing.
#[derive(Debug, Clone)]
pub(crate) struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: u8,
}

/// Parses delimited tabular text. The first record is always the header.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file into a typed dataset.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(Dataset, SourceMetadata)> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| DatasiftError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned());
        self.parse_source(&contents, file)
    }

    /// Parse in-memory text into a typed dataset.
    pub fn parse_str(&self, text: &str) -> Result<(Dataset, SourceMetadata)> {
        self.parse_source(text.as_bytes(), None)
    }

    /// Parse raw bytes into a typed dataset.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<(Dataset, SourceMetadata)> {
        self.parse_source(bytes, None)
    }

    fn parse_source(&self, bytes: &[u8], file: Option<String>) -> Result<(Dataset, SourceMetadata)> {
        let raw = self.read_table(bytes)?;
        let delimiter = raw.delimiter;
        let dataset = Dataset::from_cells(raw.headers, raw.rows)?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let metadata = SourceMetadata::new(
            file,
            hash,
            bytes.len() as u64,
            format_name(delimiter).to_string(),
            dataset.row_count(),
            dataset.column_count(),
        );

        debug!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            format = %metadata.format,
            "parsed dataset"
        );

        Ok((dataset, metadata))
    }

    /// Read header and cells without typing them.
    pub(crate) fn read_table(&self, bytes: &[u8]) -> Result<RawTable> {
        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(bytes)?,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(DatasiftError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut rows = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result?;
            // Skip blank lines the reader passes through as a single empty field.
            if record.len() == 1 && record[0].trim().is_empty() && expected_cols > 1 {
                continue;
            }

            if record.len() > expected_cols {
                let line = record
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(row_idx as u64 + 2);
                return Err(DatasiftError::InvalidInput(format!(
                    "Line {} has {} fields, expected {}",
                    line,
                    record.len(),
                    expected_cols
                )));
            }

            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(expected_cols, String::new());
            rows.push(row);
        }

        Ok(RawTable {
            headers,
            rows,
            delimiter,
        })
    }
}

fn format_name(delimiter: u8) -> &'static str {
    match delimiter {
        b'\t' => "tsv",
        b',' => "csv",
        b';' => "csv-semicolon",
        b'|' => "psv",
        _ => "delimited",
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(DatasiftError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let variance =
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64;

        // Higher count with lower variance wins; tabs get a small bonus.
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ColumnKind, Value};

    #[test]
    fn test_detect_delimiter_csv() {
        assert_eq!(detect_delimiter(b"a,b,c\n1,2,3\n4,5,6").unwrap(), b',');
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        assert_eq!(detect_delimiter(b"a\tb\tc\n1\t2\t3\n4\t5\t6").unwrap(), b'\t');
    }

    #[test]
    fn test_detect_delimiter_quoted_commas() {
        let data = b"name;note\n\"Smith, J\";ok\n\"Doe, A\";late";
        assert_eq!(detect_delimiter(data).unwrap(), b';');
    }

    #[test]
    fn test_parse_csv() {
        let (ds, meta) = Parser::new()
            .parse_str("CustomerID,Amount\nA,10\nB,1000\nC,12")
            .unwrap();

        assert_eq!(meta.format, "csv");
        assert_eq!(meta.row_count, 3);
        assert!(meta.hash.starts_with("sha256:"));
        assert_eq!(ds.schema().column("Amount").unwrap().kind, ColumnKind::Numeric);
        assert_eq!(ds.get(1, "Amount"), Some(&Value::Number(1000.0)));
    }

    #[test]
    fn test_short_rows_padded_with_missing() {
        let (ds, _) = Parser::new().parse_str("a,b,c\n1,2\n3,4,5").unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.get(0, "c"), Some(&Value::Missing));
        assert_eq!(ds.get(1, "c"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_long_row_is_input_error() {
        let err = Parser::new().parse_str("a,b\n1,2\n1,2,3\n").unwrap_err();
        match err {
            DatasiftError::InvalidInput(message) => {
                assert!(message.contains("Line 3"), "{}", message);
                assert!(message.contains("3 fields, expected 2"), "{}", message);
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let (ds, _) = Parser::new().parse_str("a,b\n").unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.column_count(), 2);
    }

    #[test]
    fn test_empty_input_is_error() {
        let err = Parser::new().parse_str("").unwrap_err();
        assert!(matches!(err, DatasiftError::EmptyData(_)));
    }

    #[test]
    fn test_max_rows() {
        let parser = Parser::with_config(ParserConfig {
            max_rows: Some(1),
            ..Default::default()
        });
        let (ds, _) = parser.parse_str("a,b\n1,2\n3,4").unwrap();
        assert_eq!(ds.row_count(), 1);
    }
}
