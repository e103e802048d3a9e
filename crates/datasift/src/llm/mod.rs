//! Rule interpretation services.
//!
//! The interpreter hands raw rule text to an [`LlmProvider`] and reads back a
//! JSON answer. Providers:
//!
//! - **OpenAI** - GPT models via API (requires `OPENAI_API_KEY`)
//! - **Ollama** - Local models, no API key needed (requires Ollama installed)
//! - **Keyword** - Offline reader for common rule phrasings
//! - **Mock** - Canned answers for tests
//!
//! # Example
//!
//! ```no_run
//! use datasift::{Analyzer, KeywordProvider};
//!
//! let analyzer = Analyzer::new().with_llm(KeywordProvider::new());
//! let report = analyzer
//!     .analyze_files("data.csv", "rules.csv")
//!     .unwrap();
//! println!("{}", report.summary);
//! ```

mod keyword;
mod mock;
mod ollama;
mod openai;
mod prompts;
mod provider;

pub use keyword::KeywordProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use prompts::interpretation_prompt;
pub use provider::{LlmConfig, LlmProvider};
