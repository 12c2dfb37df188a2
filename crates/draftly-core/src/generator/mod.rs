//! Reply text generation.
//!
//! The workflow depends only on [`ContentGenerator`]. One provider is picked
//! when the process is configured ([`from_config`]) and used for every draft.

mod gemini;
mod openai;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AiConfig, AiProvider};
use crate::{Error, Result};

/// Errors reported by a content generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        /// Provider name.
        provider: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The provider answered without any text.
    #[error("{0} returned no reply text")]
    EmptyReply(&'static str),
}

/// Produces reply text for an inbound email.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &'static str;

    /// Write a reply to `email_content` in the given tone.
    async fn generate_reply(
        &self,
        email_content: &str,
        tone: &str,
    ) -> std::result::Result<String, GenerationError>;
}

/// Build the generator selected by `config`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the selected provider has no API key.
pub fn from_config(config: &AiConfig) -> Result<Arc<dyn ContentGenerator>> {
    match config.provider {
        AiProvider::Gemini => {
            let key = required_key(config.gemini_api_key.as_deref(), "gemini_api_key")?;
            Ok(Arc::new(GeminiGenerator::new(key, &config.gemini_model)))
        }
        AiProvider::OpenAi => {
            let key = required_key(config.openai_api_key.as_deref(), "openai_api_key")?;
            Ok(Arc::new(OpenAiGenerator::new(key, &config.openai_model)))
        }
    }
}

fn required_key<'a>(key: Option<&'a str>, field: &str) -> Result<&'a str> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("ai.{field} is required for the selected provider")))
}
