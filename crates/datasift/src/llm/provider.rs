//! Interpretation service trait and configuration.

use std::time::Duration;

use crate::error::Result;
use crate::input::RawRule;

/// Configuration for interpretation providers.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model to use (e.g., "gpt-4o-mini").
    pub model: String,

    /// Maximum tokens in response.
    pub max_tokens: usize,

    /// Temperature for generation (0.0-1.0).
    pub temperature: f64,

    /// Upper bound on one request. A request that runs past it fails like an
    /// unreachable service.
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }
}

impl LlmConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A natural-language understanding service that structures rules.
///
/// Implementations must be thread-safe (Send + Sync) so concurrent runs
/// can share one provider. A provider keeps no per-run state.
pub trait LlmProvider: Send + Sync {
    /// Ask the service to structure the given rules.
    ///
    /// # Arguments
    /// * `rules` - The raw rules, in upload order
    /// * `columns` - Column names of the dataset the rules will run against
    ///
    /// # Returns
    /// The service's raw answer, to be read by
    /// [`parse_rules_response`](crate::rules::parse_rules_response)
    fn interpret_rules(&self, rules: &[RawRule], columns: &[String]) -> Result<String>;

    /// Get the configuration for this provider.
    fn config(&self) -> &LlmConfig;

    /// Get the name of this provider (for logging/debugging).
    fn name(&self) -> &str;
}
