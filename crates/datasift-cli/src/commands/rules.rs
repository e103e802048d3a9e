//! Rules command - list a rules table and optionally show how it is interpreted.

use std::path::PathBuf;

use colored::Colorize;
use datasift::{Parser, RuleInterpreter, RuleSet};

use crate::cli::LlmProviderChoice;
use crate::commands::build_provider;

pub fn run(
    file: PathBuf,
    interpret: bool,
    data: Option<PathBuf>,
    llm: LlmProviderChoice,
    model: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let rule_set = RuleSet::parse_file(&file)?;

    if !interpret {
        if json {
            println!("{}", serde_json::to_string_pretty(&rule_set)?);
        } else {
            println!(
                "{} {} rules",
                "Loaded".cyan().bold(),
                rule_set.len().to_string().white().bold()
            );
            for (index, rule) in rule_set.rules.iter().enumerate() {
                println!("  {:>3}  {}", index, rule.description().unwrap_or("-"));
            }
        }
        return Ok(());
    }

    let columns: Vec<String> = match data {
        Some(path) => {
            let (dataset, _) = Parser::new().parse_file(&path)?;
            dataset.schema().names().map(String::from).collect()
        }
        None => Vec::new(),
    };

    let interpreter = match build_provider(&llm, model)? {
        Some(provider) => RuleInterpreter::new(provider),
        None => RuleInterpreter::without_service(),
    };
    let interpretation = interpreter.interpret(&rule_set.rules, &columns);

    if json {
        println!("{}", serde_json::to_string_pretty(&interpretation)?);
        return Ok(());
    }

    println!(
        "{} {} of {} rules using {}",
        "Interpreted".cyan().bold(),
        interpretation.rules.len().to_string().white().bold(),
        rule_set.len(),
        llm
    );
    for rule in &interpretation.rules {
        let line = format!("{}", rule.condition);
        if rule.is_evaluable() {
            println!("  {:40} {}", rule.description, line.green());
        } else {
            println!("  {:40} {}", rule.description, line.red());
        }
    }

    if !interpretation.warnings.is_empty() {
        println!();
        println!("{}", "Warnings:".yellow().bold());
        for warning in &interpretation.warnings {
            println!("  {}", warning.message);
        }
    }

    Ok(())
}
