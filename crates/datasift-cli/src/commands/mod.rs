//! CLI command implementations.

pub mod analyze;
pub mod inspect;
pub mod rules;

use std::sync::Arc;

use datasift::{KeywordProvider, LlmConfig, LlmProvider, OllamaProvider, OpenAIProvider};

use crate::cli::LlmProviderChoice;

/// Build the interpretation service for a provider choice.
///
/// Returns `None` for [`LlmProviderChoice::None`]; the pipeline then reports
/// every rule as not applied.
pub fn build_provider(
    choice: &LlmProviderChoice,
    model: Option<String>,
) -> Result<Option<Arc<dyn LlmProvider>>, Box<dyn std::error::Error>> {
    let provider: Arc<dyn LlmProvider> = match choice {
        LlmProviderChoice::None => return Ok(None),
        LlmProviderChoice::Offline => Arc::new(KeywordProvider::new()),
        LlmProviderChoice::OpenAI => {
            let config = match model {
                Some(m) => LlmConfig::default().with_model(m),
                None => LlmConfig::default(),
            };
            Arc::new(OpenAIProvider::from_env_with_config(config)?)
        }
        LlmProviderChoice::Ollama => match model {
            Some(m) => Arc::new(OllamaProvider::with_model(m)?),
            None => Arc::new(OllamaProvider::new()?),
        },
    };
    Ok(Some(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_provider_for_none() {
        let provider = build_provider(&LlmProviderChoice::None, None).unwrap();
        assert!(provider.is_none());
    }

    #[test]
    fn test_offline_provider() {
        let provider = build_provider(&LlmProviderChoice::Offline, None)
            .unwrap()
            .unwrap();
        assert_eq!(provider.name(), "keyword");
    }
}
