//! Process configuration.
//!
//! Loaded from a JSON file; secrets can be supplied through environment
//! variables instead of the file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transport::DEFAULT_API_BASE;
use crate::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `SQLite` database file. The binary picks a per-user data directory when unset.
    pub database_path: Option<String>,
    /// Draft defaults.
    pub drafts: DraftSettings,
    /// Retry scheduler settings.
    pub retry: RetrySettings,
    /// Content generator selection.
    pub ai: AiConfig,
    /// `OAuth2` client used to refresh Gmail credentials.
    pub oauth: OAuthSettings,
    /// Gmail API settings.
    pub gmail: GmailSettings,
}

/// Defaults applied to new drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftSettings {
    /// Send attempts before a draft is left for manual intervention.
    pub max_attempts: u32,
    /// Tone used when neither the caller nor the user's preferences name one.
    pub default_tone: String,
    /// Subject of drafts sent as new messages rather than replies.
    pub new_message_subject: String,
    /// Maximum number of drafts returned by a listing.
    pub list_limit: u32,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_tone: "formal".to_string(),
            new_message_subject: "Draftly Reply".to_string(),
            list_limit: 50,
        }
    }
}

/// Retry scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Delay between the end of one sweep and the start of the next.
    pub interval_secs: u64,
    /// Drafts examined per sweep.
    pub batch_size: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            batch_size: 10,
        }
    }
}

impl RetrySettings {
    /// Sweep interval as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Supported content generator providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Google Gemini.
    #[default]
    Gemini,
    /// `OpenAI` chat completions.
    #[serde(rename = "openai")]
    OpenAi,
}

impl AiProvider {
    /// Parse a provider name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

/// Content generator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Selected provider.
    pub provider: AiProvider,
    /// Gemini API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    /// Gemini model.
    pub gemini_model: String,
    /// `OpenAI` API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    /// `OpenAI` model.
    pub openai_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::Gemini,
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
        }
    }
}

/// `OAuth2` client credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    /// Client ID.
    pub client_id: String,
    /// Client secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Gmail API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailSettings {
    /// API root.
    pub api_base: String,
}

impl Default for GmailSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `DRAFTLY_AI_PROVIDER` names an unknown provider.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `DRAFTLY_AI_PROVIDER` names an unknown provider.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("DRAFTLY_GEMINI_API_KEY") {
            self.ai.gemini_api_key = Some(key);
        }
        if let Some(key) = get("DRAFTLY_OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(key);
        }
        if let Some(id) = get("DRAFTLY_OAUTH_CLIENT_ID") {
            self.oauth.client_id = id;
        }
        if let Some(secret) = get("DRAFTLY_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = Some(secret);
        }
        if let Some(provider) = get("DRAFTLY_AI_PROVIDER") {
            self.ai.provider = AiProvider::parse(&provider)
                .ok_or_else(|| Error::Config(format!("unknown AI provider {provider:?}")))?;
        }
        Ok(())
    }

    /// Check values that would otherwise fail later at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.drafts.max_attempts == 0 {
            return Err(Error::Config("drafts.max_attempts must be at least 1".into()));
        }
        if self.drafts.list_limit == 0 {
            return Err(Error::Config("drafts.list_limit must be at least 1".into()));
        }
        if self.drafts.default_tone.trim().is_empty() {
            return Err(Error::Config("drafts.default_tone must not be empty".into()));
        }
        if self.retry.batch_size == 0 {
            return Err(Error::Config("retry.batch_size must be at least 1".into()));
        }
        if self.retry.interval_secs == 0 {
            return Err(Error::Config("retry.interval_secs must be at least 1".into()));
        }
        if self.oauth.client_id.trim().is_empty() {
            return Err(Error::Config("oauth.client_id is required".into()));
        }
        url::Url::parse(&self.gmail.api_base)
            .map_err(|e| Error::Config(format!("gmail.api_base: {e}")))?;
        Ok(())
    }
}
