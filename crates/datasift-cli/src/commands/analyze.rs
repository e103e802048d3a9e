//! Analyze command - check a data file against a rules file and flag anomalies.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use datasift::{
    AnalysisReport, Analyzer, AnalyzerConfig, DetectorConfig, MatchOptions, WarningKind,
};
use tracing::debug;

use crate::cli::LlmProviderChoice;
use crate::commands::build_provider;

/// Rows listed per section in the human-readable summary.
const LISTED_ROWS: usize = 10;

pub struct AnalyzeArgs {
    pub data: PathBuf,
    pub rules: PathBuf,
    pub contamination: f64,
    pub seed: u64,
    pub llm: LlmProviderChoice,
    pub model: Option<String>,
    pub timeout: Option<u64>,
    pub case_insensitive: bool,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
}

impl AnalyzeArgs {
    fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            matching: MatchOptions::default().with_case_sensitive(!self.case_insensitive),
            detector: DetectorConfig::default()
                .with_contamination(self.contamination)
                .with_seed(self.seed),
            interpreter_timeout: self.timeout.map(Duration::from_secs),
            ..AnalyzerConfig::default()
        }
    }
}

pub fn run(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    for path in [&args.data, &args.rules] {
        if !path.exists() {
            return Err(format!("File not found: {}", path.display()).into());
        }
    }

    if !args.json {
        println!(
            "{} {} {} {}",
            "Analyzing".cyan().bold(),
            args.data.display().to_string().white(),
            "against".cyan(),
            args.rules.display().to_string().white()
        );
    }

    let config = args.analyzer_config();
    debug!(provider = %args.llm, ?config, "configured analyzer");
    let mut analyzer = Analyzer::with_config(config);
    if let Some(provider) = build_provider(&args.llm, args.model.clone())? {
        analyzer = analyzer.with_shared_llm(provider);
    }

    let report = analyzer.analyze_files(&args.data, &args.rules)?;

    if let Some(ref path) = args.output {
        let text = serde_json::to_string_pretty(&report.to_json()?)?;
        std::fs::write(path, text)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.to_view()?)?);
        return Ok(());
    }

    print_summary(&report, args.verbose);

    if let Some(path) = args.output {
        println!();
        println!(
            "{} {}",
            "Saved to".green().bold(),
            path.display().to_string().white()
        );
    }

    Ok(())
}

fn print_summary(report: &AnalysisReport, verbose: bool) {
    if verbose {
        println!();
        println!("{}", "Rules:".yellow().bold());
        for (index, rule) in report.rules.iter().enumerate() {
            println!("  {:>3}  {:40} {}", index, rule.description, rule.condition);
        }
    }

    println!();
    println!(
        "Checked {} rows against {} rules",
        report.row_count.to_string().white().bold(),
        report.rules.len().to_string().white().bold()
    );
    println!(
        "Found {} rule violations and {} anomalies ({:.1}%)",
        report.rule_violation_count.to_string().red(),
        report.anomaly_count.to_string().yellow(),
        report.anomaly_percentage
    );

    if report.rule_violation_count > 0 {
        println!();
        println!("{}", "Rule violations:".red().bold());
        for row in report.violating_rows().take(LISTED_ROWS) {
            println!("  row {:>5}  {}", row.id, row.violation_justification);
        }
        if report.rule_violation_count > LISTED_ROWS {
            println!("  ... and {} more", report.rule_violation_count - LISTED_ROWS);
        }
    }

    if report.anomaly_count > 0 {
        println!();
        println!("{}", "Anomalies:".yellow().bold());
        for row in report.anomalous_rows().take(LISTED_ROWS) {
            let score = row
                .anomaly_score
                .map(|s| format!("{:.4}", s))
                .unwrap_or_default();
            println!("  row {:>5}  score {}", row.id, score);
        }
        if report.anomaly_count > LISTED_ROWS {
            println!("  ... and {} more", report.anomaly_count - LISTED_ROWS);
        }

        if verbose {
            println!();
            println!("{}", "Anomalous rows by column:".yellow().bold());
            for (column, summary) in &report.column_summaries {
                match summary {
                    Some(s) => println!(
                        "  {:20} mean {:>12.3}  min {:>12.3}  max {:>12.3}",
                        column, s.mean, s.min, s.max
                    ),
                    None => println!("  {:20} no values", column),
                }
            }
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{}", "Warnings:".yellow().bold());
        for warning in &report.warnings {
            let label = match warning.kind {
                WarningKind::InterpreterUnavailable => "service unavailable",
                WarningKind::UnparsableResponse => "unparsable answer",
                WarningKind::MalformedEntry => "malformed entry",
                WarningKind::RuleNotInterpreted => "not interpreted",
                WarningKind::UnevaluableRule => "not applied",
            };
            match warning.rule_index {
                Some(index) => println!("  rule {:>3}  {}: {}", index, label, warning.message),
                None => println!("  {}: {}", label, warning.message),
            }
        }
    }

    println!();
    if report.rule_violation_count == 0 && report.anomaly_count == 0 {
        println!("{}", "No issues found - data looks clean!".green());
    } else {
        println!("{}", report.summary);
    }
}
