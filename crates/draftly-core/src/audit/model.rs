//! Audit log model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DraftId;

/// Who caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    /// The workflow itself (generation, scheduler-driven sends).
    System,
    /// A user action.
    User,
}

impl Actor {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SYSTEM" => Some(Self::System),
            "USER" => Some(Self::User),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::User => "USER",
        }
    }
}

/// Lifecycle transition recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftAction {
    /// Draft created from generated text.
    Generated,
    /// Text replaced by the user.
    Edited,
    /// Approved for sending.
    Approved,
    /// Rejected by the user.
    Rejected,
    /// Send claimed, outbound call about to be issued.
    SendStarted,
    /// Transport accepted the message.
    Sent,
    /// Send attempt failed.
    Failed,
}

impl DraftAction {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GENERATED" => Some(Self::Generated),
            "EDITED" => Some(Self::Edited),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "SEND_STARTED" => Some(Self::SendStarted),
            "SENT" => Some(Self::Sent),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "GENERATED",
            Self::Edited => "EDITED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::SendStarted => "SEND_STARTED",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for DraftAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftLog {
    /// Row identifier.
    pub id: i64,
    /// Draft the entry belongs to.
    pub draft_id: DraftId,
    /// Who caused it.
    pub actor: Actor,
    /// What happened.
    pub action: DraftAction,
    /// Free-form structured detail.
    pub meta: serde_json::Value,
    /// When it happened.
    pub created_at: DateTime<Utc>,
}
