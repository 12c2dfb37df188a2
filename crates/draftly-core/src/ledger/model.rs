//! Send attempt model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DraftId;

/// Outcome of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    /// The outbound call was issued and has not been resolved. A row left in
    /// this state after a crash is "in doubt".
    Started,
    /// The transport accepted the message.
    Succeeded,
    /// The outbound call failed.
    Failed,
}

impl SendStatus {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STARTED" => Some(Self::Started),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One send try for a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAttempt {
    /// Row identifier.
    pub id: i64,
    /// Draft being sent.
    pub draft_id: DraftId,
    /// 1-based sequence number within the draft.
    pub attempt_no: u32,
    /// Outcome.
    pub status: SendStatus,
    /// Transport id on success.
    pub transport_message_id: Option<String>,
    /// Stable error code on failure.
    pub error_code: Option<String>,
    /// Error text on failure.
    pub error_message: Option<String>,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
    /// When the attempt was resolved.
    pub finished_at: Option<DateTime<Utc>>,
}

impl SendAttempt {
    /// Whether the attempt was never resolved.
    #[must_use]
    pub fn is_in_doubt(&self) -> bool {
        self.status == SendStatus::Started
    }
}
