//! `OpenAI` chat completions generator.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ContentGenerator, GenerationError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const NAME: &str = "openai";

/// Generates replies with the `OpenAI` chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    /// Creates a generator for `model` (e.g. `gpt-4o-mini`).
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Points the generator at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate_reply(
        &self,
        email_content: &str,
        tone: &str,
    ) -> Result<String, GenerationError> {
        let prompt =
            format!("Write a {tone} professional email reply to this email:\n\n{email_content}");
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt,
            }],
        };

        debug!(model = %self.model, tone, "requesting openai reply");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Api {
                provider: NAME,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response.json::<ChatResponse>().await?.into_text()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, GenerationError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(GenerationError::EmptyReply(NAME))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_choice_content() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Hi Alice," } }]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "Hi Alice,");
    }

    #[test]
    fn test_blank_content_is_an_error() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  " } }]
        }))
        .unwrap();
        assert!(matches!(
            response.into_text(),
            Err(GenerationError::EmptyReply("openai"))
        ));
    }
}
