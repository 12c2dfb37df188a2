//! User model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    /// Create a new user ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mailbox owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Mailbox address; new (non-reply) drafts are sent here.
    pub email: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Per-user drafting preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    /// Tone used when the caller does not name one.
    pub default_tone: Option<String>,
    /// Text appended to generated replies.
    pub signature: Option<String>,
    /// Opt-in flag for learning the user's writing style.
    pub style_learning_enabled: bool,
}

impl UserPreference {
    /// The stored default tone, ignoring blank values.
    #[must_use]
    pub fn tone(&self) -> Option<&str> {
        self.default_tone
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Append the signature to generated text, separated by a blank line.
    #[must_use]
    pub fn sign(&self, text: &str) -> String {
        match self.signature.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(signature) => format!("{text}\n\n{signature}"),
            None => text.to_string(),
        }
    }
}
