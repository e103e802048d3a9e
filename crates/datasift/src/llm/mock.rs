//! Mock provider for testing.

use std::sync::Mutex;

use crate::error::{DatasiftError, Result};
use crate::input::RawRule;

use super::provider::{LlmConfig, LlmProvider};

/// A scripted answer.
#[derive(Debug, Clone)]
enum Scripted {
    Respond(String),
    Fail(String),
}

/// Mock provider that returns canned answers, in order.
///
/// The last scripted answer repeats once the script is exhausted.
pub struct MockProvider {
    config: LlmConfig,
    script: Mutex<Vec<Scripted>>,
    calls: Mutex<usize>,
}

impl MockProvider {
    /// A provider that always answers with `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self::scripted(vec![Scripted::Respond(response.into())])
    }

    /// A provider that always fails as if the service were unreachable.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::scripted(vec![Scripted::Fail(message.into())])
    }

    /// Queue another answer after the current ones.
    pub fn then_respond(self, response: impl Into<String>) -> Self {
        self.push(Scripted::Respond(response.into()))
    }

    /// Queue a failure after the current answers.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Fail(message.into()))
    }

    /// Number of times the provider was asked.
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }

    fn scripted(script: Vec<Scripted>) -> Self {
        Self {
            config: LlmConfig::default().with_model("mock"),
            script: Mutex::new(script),
            calls: Mutex::new(0),
        }
    }

    fn push(self, entry: Scripted) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push(entry);
        }
        self
    }
}

impl LlmProvider for MockProvider {
    fn interpret_rules(&self, _rules: &[RawRule], _columns: &[String]) -> Result<String> {
        let call = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| DatasiftError::Internal("mock call counter poisoned".to_string()))?;
            *calls += 1;
            *calls - 1
        };

        let script = self
            .script
            .lock()
            .map_err(|_| DatasiftError::Internal("mock script poisoned".to_string()))?;
        let entry = script
            .get(call)
            .or_else(|| script.last())
            .cloned()
            .ok_or_else(|| DatasiftError::Internal("mock provider has no script".to_string()))?;

        match entry {
            Scripted::Respond(text) => Ok(text),
            Scripted::Fail(message) => Err(DatasiftError::Llm(message)),
        }
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_order_and_repeat() {
        let provider = MockProvider::with_response("[]").then_fail("down");

        assert_eq!(provider.interpret_rules(&[], &[]).unwrap(), "[]");
        assert!(matches!(
            provider.interpret_rules(&[], &[]),
            Err(DatasiftError::Llm(_))
        ));
        assert!(provider.interpret_rules(&[], &[]).is_err());
        assert_eq!(provider.calls(), 3);
    }
}
