//! datasift CLI - rule-driven data quality analysis.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use datasift::{DatasiftError, Fault};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code for a failed command: 1 for bad input, 2 for pipeline failures.
fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<DatasiftError>().map(DatasiftError::fault) {
        Some(Fault::Server) => 2,
        _ => 1,
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    init_logging(level);

    let result = match cli.command {
        Commands::Inspect { file, rows, json } => commands::inspect::run(file, rows, json),

        Commands::Rules {
            file,
            interpret,
            data,
            llm,
            model,
            json,
        } => commands::rules::run(file, interpret, data, llm, model, json),

        Commands::Analyze {
            data,
            rules,
            contamination,
            seed,
            llm,
            model,
            timeout,
            case_insensitive,
            output,
            json,
        } => commands::analyze::run(commands::analyze::AnalyzeArgs {
            data,
            rules,
            contamination,
            seed,
            llm,
            model,
            timeout,
            case_insensitive,
            output,
            json,
            verbose: cli.verbose,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(e.as_ref()));
    }
}
