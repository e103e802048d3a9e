//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// datasift: rule-driven data quality analysis
#[derive(Parser)]
#[command(name = "datasift")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show columns, row count and a preview of a data file
    Inspect {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "DATA")]
        file: PathBuf,

        /// Number of preview rows
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a rules table, optionally with its interpretation
    Rules {
        /// Path to the rules file (must have a `description` column)
        #[arg(value_name = "RULES")]
        file: PathBuf,

        /// Interpret the rules and show the structured result
        #[arg(long)]
        interpret: bool,

        /// Data file whose columns the rules refer to
        #[arg(long, value_name = "DATA")]
        data: Option<PathBuf>,

        /// Rule interpretation service
        #[arg(long, default_value = "offline")]
        llm: LlmProviderChoice,

        /// Model to use (provider-specific, e.g., "gpt-4o-mini", "llama3.2")
        #[arg(long)]
        model: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a data file against a rules file and detect anomalies
    Analyze {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Path to the rules file (must have a `description` column)
        #[arg(value_name = "RULES")]
        rules: PathBuf,

        /// Expected share of anomalous rows, between 0 and 1
        #[arg(short, long, default_value = "0.1")]
        contamination: f64,

        /// Seed for the anomaly detector
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Rule interpretation service
        #[arg(long, default_value = "offline")]
        llm: LlmProviderChoice,

        /// Model to use (provider-specific, e.g., "gpt-4o-mini", "llama3.2")
        #[arg(long)]
        model: Option<String>,

        /// Seconds to wait for the interpretation service
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Match text values and patterns ignoring case
        #[arg(long)]
        case_insensitive: bool,

        /// Write the full report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report view as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

/// Rule interpretation service choice
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LlmProviderChoice {
    /// Offline phrase reader, no network
    #[default]
    Offline,
    /// OpenAI GPT API (requires OPENAI_API_KEY)
    OpenAI,
    /// Ollama local models (requires Ollama running)
    Ollama,
    /// No interpretation; rules are reported as not applied
    None,
}

impl std::str::FromStr for LlmProviderChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "offline" | "keyword" => Ok(LlmProviderChoice::Offline),
            "openai" | "gpt" => Ok(LlmProviderChoice::OpenAI),
            "ollama" | "local" => Ok(LlmProviderChoice::Ollama),
            "none" => Ok(LlmProviderChoice::None),
            _ => Err(format!(
                "Unknown provider: {}. Use: offline, openai, ollama, or none.",
                s
            )),
        }
    }
}

impl std::fmt::Display for LlmProviderChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderChoice::Offline => write!(f, "offline"),
            LlmProviderChoice::OpenAI => write!(f, "openai"),
            LlmProviderChoice::Ollama => write!(f, "ollama"),
            LlmProviderChoice::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_defaults() {
        let cli = Cli::parse_from(["datasift", "analyze", "data.csv", "rules.csv"]);
        match cli.command {
            Commands::Analyze {
                contamination,
                seed,
                llm,
                json,
                ..
            } => {
                assert_eq!(contamination, 0.1);
                assert_eq!(seed, 42);
                assert_eq!(llm, LlmProviderChoice::Offline);
                assert!(!json);
            }
            _ => panic!("expected analyze"),
        }
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_provider_choice_parse() {
        assert_eq!("GPT".parse::<LlmProviderChoice>(), Ok(LlmProviderChoice::OpenAI));
        assert!("claude".parse::<LlmProviderChoice>().is_err());
    }
}
