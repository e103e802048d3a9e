//! Rule interpretation: raw rules to structured rules.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::parse::parse_rules_response;
use super::rule::StructuredRule;
use crate::error::{DatasiftError, Result};
use crate::input::RawRule;
use crate::llm::LlmProvider;
use crate::pipeline::Stage;
use crate::warning::{Warning, WarningKind};

/// Structured rules plus the soft failures met while producing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interpretation {
    /// Rules in raw-rule order.
    pub rules: Vec<StructuredRule>,
    pub warnings: Vec<Warning>,
}

impl Interpretation {
    /// True when the service itself failed or its whole answer was unreadable,
    /// as opposed to answering with some malformed or no usable rules.
    pub fn service_failed(&self) -> bool {
        self.warnings.iter().any(|w| {
            matches!(
                w.kind,
                WarningKind::InterpreterUnavailable | WarningKind::UnparsableResponse
            )
        })
    }
}

/// Turns raw rules into structured rules through an interpretation service.
///
/// Never fails: service errors, timeouts and unreadable answers degrade to
/// fewer rules plus warnings.
#[derive(Clone)]
pub struct RuleInterpreter {
    provider: Option<Arc<dyn LlmProvider>>,
    timeout: Option<Duration>,
}

impl RuleInterpreter {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
            timeout: None,
        }
    }

    /// An interpreter with no service; every run reports the service as unavailable.
    pub fn without_service() -> Self {
        Self {
            provider: None,
            timeout: None,
        }
    }

    /// Bound the wait for the service, independent of the provider's own timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Interpret raw rules against a dataset with the given columns.
    pub fn interpret(&self, raw_rules: &[RawRule], columns: &[String]) -> Interpretation {
        let mut interpretation = Interpretation::default();
        if raw_rules.is_empty() {
            return interpretation;
        }

        let Some(provider) = &self.provider else {
            interpretation.warnings.push(Warning::new(
                Stage::RulesInterpreted,
                WarningKind::InterpreterUnavailable,
                "No interpretation service configured; no rules were applied",
            ));
            return interpretation;
        };

        let response = match self.ask(provider, raw_rules, columns) {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "rule interpretation failed");
                interpretation.warnings.push(Warning::new(
                    Stage::RulesInterpreted,
                    WarningKind::InterpreterUnavailable,
                    format!("Interpretation service '{}' failed: {}", provider.name(), e),
                ));
                return interpretation;
            }
        };

        let parsed = match parse_rules_response(&response, raw_rules) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "unparsable interpretation response");
                interpretation.warnings.push(Warning::new(
                    Stage::RulesInterpreted,
                    WarningKind::UnparsableResponse,
                    e.to_string(),
                ));
                return interpretation;
            }
        };

        let mut covered = vec![false; raw_rules.len()];

        for (index, message) in parsed.rejected {
            if let Some(i) = index {
                if let Some(slot) = covered.get_mut(i) {
                    *slot = true;
                }
            }
            let warning =
                Warning::new(Stage::RulesInterpreted, WarningKind::MalformedEntry, message);
            interpretation.warnings.push(match index {
                Some(i) => warning.for_rule(i),
                None => warning,
            });
        }

        let mut rules = parsed.rules;
        rules.sort_by_key(|(index, _)| *index);
        for (index, _) in &rules {
            covered[*index] = true;
        }

        for (index, done) in covered.iter().enumerate() {
            if !done {
                let description = raw_rules[index].description().unwrap_or_default();
                interpretation.warnings.push(
                    Warning::new(
                        Stage::RulesInterpreted,
                        WarningKind::RuleNotInterpreted,
                        format!("No interpretation returned for rule '{}'", description),
                    )
                    .for_rule(index),
                );
            }
        }

        interpretation.rules = rules.into_iter().map(|(_, rule)| rule).collect();
        info!(
            provider = provider.name(),
            raw = raw_rules.len(),
            structured = interpretation.rules.len(),
            "rules interpreted"
        );
        interpretation
    }

    /// Call the provider, enforcing the timeout when one is set.
    fn ask(
        &self,
        provider: &Arc<dyn LlmProvider>,
        raw_rules: &[RawRule],
        columns: &[String],
    ) -> Result<String> {
        let Some(timeout) = self.timeout else {
            return provider.interpret_rules(raw_rules, columns);
        };

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(provider);
        let rules = raw_rules.to_vec();
        let columns = columns.to_vec();
        thread::spawn(move || {
            // The receiver may be gone after a timeout.
            let _ = tx.send(worker.interpret_rules(&rules, &columns));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                debug!(?timeout, "interpretation timed out");
                Err(DatasiftError::Llm(format!(
                    "Interpretation timed out after {:?}",
                    timeout
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DatasiftError::Llm(
                "Interpretation worker stopped without answering".to_string(),
            )),
        }
    }
}
