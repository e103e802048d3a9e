//! Inspect command - show what a data file looks like after loading.

use std::path::PathBuf;

use colored::Colorize;
use datasift::Parser;

pub fn run(file: PathBuf, rows: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let (dataset, source) = Parser::new().parse_file(&file)?;
    let summary = dataset.upload_summary(rows);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} {} ({}, {} bytes)",
        "Loaded".cyan().bold(),
        file.display().to_string().white(),
        source.format,
        source.size_bytes
    );
    println!(
        "{} rows, {} columns",
        summary.row_count.to_string().white().bold(),
        summary.columns.len().to_string().white().bold()
    );

    println!();
    println!("{}", "Columns:".yellow().bold());
    for column in dataset.schema().columns() {
        let kind = if column.kind.is_numeric() {
            "numeric".blue()
        } else {
            "categorical".normal()
        };
        println!("  {:20} {}", column.name, kind);
    }

    if !summary.preview.is_empty() {
        println!();
        println!("{}", "Preview:".yellow().bold());
        for (i, row) in summary.preview.iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            println!("  {:>3}  {}", i + 1, cells.join(", "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_inspect_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"id,amount\nA,1\nB,2\n").unwrap();
        assert!(run(file.path().to_path_buf(), 5, true).is_ok());
        assert!(run(file.path().to_path_buf(), 1, false).is_ok());
    }

    #[test]
    fn test_inspect_missing_file() {
        assert!(run(PathBuf::from("/nonexistent/data.csv"), 5, false).is_err());
    }
}
