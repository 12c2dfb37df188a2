//! Error types for the core library.

use thiserror::Error;

use crate::draft::DraftStatus;
use crate::generator::GenerationError;
use crate::transport::TransportError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A draft, user or credential does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// Identifier used for the lookup.
        id: String,
    },

    /// Lifecycle operation attempted from a disallowed source state.
    #[error("cannot {operation} a draft in status {status}")]
    InvalidState {
        /// Operation that was refused.
        operation: &'static str,
        /// Status the draft was in.
        status: DraftStatus,
    },

    /// Send attempted outside `APPROVED`/`FAILED`.
    #[error("draft in status {status} is not eligible for sending")]
    NotEligible {
        /// Status the draft was in.
        status: DraftStatus,
    },

    /// The content generator failed.
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// The mail transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The identity provider rejected a refresh exchange.
    #[error("Credential refresh failed: {0}")]
    RefreshFailed(#[from] draftly_oauth::Error),

    /// The credential was revoked and needs a fresh login.
    #[error("Credential revoked for user {0}")]
    CredentialRevoked(crate::UserId),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Stored timestamp could not be parsed.
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// A stored row holds a value this version does not understand.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret encryption or decryption failed.
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this failure means the stored grant is dead
    /// (`invalid_grant`), as opposed to a stale access token or an outage.
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_invalid_grant(),
            Self::RefreshFailed(e) => e.is_invalid_grant(),
            _ => false,
        }
    }

    /// Short stable code recorded on failed send attempts.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::NotEligible { .. } => "not_eligible",
            Self::Generation(_) => "generation",
            Self::Transport(TransportError::InvalidGrant(_)) => "invalid_grant",
            Self::Transport(_) => "transport",
            Self::RefreshFailed(_) => "refresh_failed",
            Self::CredentialRevoked(_) => "credential_revoked",
            Self::Database(_) => "database",
            Self::Serde(_) => "serde",
            Self::Timestamp(_) | Self::Corrupt(_) => "corrupt",
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Crypto(_) => "crypto",
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grant_from_transport() {
        let err = Error::from(TransportError::InvalidGrant("token revoked".into()));
        assert!(err.is_invalid_grant());
        assert_eq!(err.code(), "invalid_grant");

        let err = Error::from(TransportError::Api {
            status: 503,
            body: "backend unavailable".into(),
        });
        assert!(!err.is_invalid_grant());
        assert_eq!(err.code(), "transport");
    }

    #[test]
    fn test_invalid_grant_from_refresh() {
        let err = Error::from(draftly_oauth::Error::oauth_error(
            "invalid_grant",
            "Token has been expired or revoked.",
        ));
        assert!(err.is_invalid_grant());
        assert_eq!(err.code(), "refresh_failed");
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn test_state_errors_display() {
        let err = Error::InvalidState {
            operation: "edit",
            status: DraftStatus::Sent,
        };
        assert_eq!(err.to_string(), "cannot edit a draft in status SENT");

        let err = Error::NotEligible {
            status: DraftStatus::Pending,
        };
        assert!(!err.is_invalid_grant());
        assert_eq!(err.code(), "not_eligible");
    }
}
