//! Credential model types.

use chrono::{DateTime, Utc};
use draftly_oauth::token::expires_soon;
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Identity provider a credential was issued by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthProvider {
    /// Google (Gmail API).
    #[default]
    Google,
}

impl AuthProvider {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GOOGLE" => Some(Self::Google),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored access/refresh secret pair for one user and provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Row identifier.
    pub id: i64,
    /// Owning user.
    pub user_id: UserId,
    /// Issuing provider.
    pub provider: AuthProvider,
    /// Current access token.
    pub access_token: Option<String>,
    /// Refresh token as produced by the configured [`SecretCipher`](super::SecretCipher).
    pub refresh_token_encrypted: String,
    /// Granted scopes.
    pub scope: Option<String>,
    /// Access token expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Set once the provider reported the grant dead.
    pub revoked_at: Option<DateTime<Utc>>,
    /// When the credential was first stored.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Whether the grant was revoked.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// The access token, if a non-blank one is stored.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Whether the access token must be refreshed before use at `now`.
    ///
    /// A missing token or missing expiry counts as expired.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token().is_none() {
            return true;
        }
        self.expires_at.is_none_or(|exp| expires_soon(exp, now))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .field("revoked_at", &self.revoked_at)
            .finish_non_exhaustive()
    }
}

/// Fields needed to store a credential after a login.
#[derive(Debug, Clone)]
pub struct NewCredential {
    /// Owning user.
    pub user_id: UserId,
    /// Issuing provider.
    pub provider: AuthProvider,
    /// Access token.
    pub access_token: Option<String>,
    /// Encrypted refresh token.
    pub refresh_token_encrypted: String,
    /// Granted scopes.
    pub scope: Option<String>,
    /// Access token expiry.
    pub expires_at: Option<DateTime<Utc>>,
}
