//! Draft model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Unique identifier for a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(pub i64);

impl DraftId {
    /// Create a new draft ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a draft.
///
/// `Sent` and `Rejected` are terminal. `Failed` is recoverable: the retry
/// scheduler or a user can send again while attempts remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    /// Freshly generated, awaiting review.
    #[default]
    Pending,
    /// Text changed by the user.
    Edited,
    /// Approved for sending.
    Approved,
    /// An outbound call is in flight.
    Sending,
    /// The transport accepted the message.
    Sent,
    /// The last send attempt failed.
    Failed,
    /// Discarded by the user.
    Rejected,
}

impl DraftStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Edited,
        Self::Approved,
        Self::Sending,
        Self::Sent,
        Self::Failed,
        Self::Rejected,
    ];

    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "EDITED" => Some(Self::Edited),
            "APPROVED" => Some(Self::Approved),
            "SENDING" => Some(Self::Sending),
            "SENT" => Some(Self::Sent),
            "FAILED" => Some(Self::Failed),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Edited => "EDITED",
            Self::Approved => "APPROVED",
            Self::Sending => "SENDING",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Whether `edit` and `approve` accept this status.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Pending | Self::Edited)
    }

    /// Whether `send` accepts this status.
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        matches!(self, Self::Approved | Self::Failed)
    }

    /// Whether the status is an exit point of the lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Rejected)
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Identifier.
    pub id: DraftId,
    /// Owning user.
    pub user_id: UserId,
    /// Transport id of the message being replied to.
    pub source_message_id: Option<String>,
    /// Transport thread of the source message.
    pub thread_id: Option<String>,
    /// Tone label the text was generated with.
    pub tone: String,
    /// Reply text.
    pub draft_text: String,
    /// Lifecycle status.
    pub status: DraftStatus,
    /// Number of send protocol runs that reached the claim step.
    pub attempts: u32,
    /// Bound on `attempts` enforced by the retry scheduler.
    pub max_attempts: u32,
    /// Error text of the last failed send.
    pub last_error: Option<String>,
    /// When the draft was generated.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// When the draft was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// When the draft was rejected.
    pub rejected_at: Option<DateTime<Utc>>,
    /// When the transport accepted the reply.
    pub sent_at: Option<DateTime<Utc>>,
}

impl Draft {
    /// Whether the retry budget is used up.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Whether this draft replies to an existing message.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.reply_to().is_some()
    }

    /// Transport id of the message being replied to. Blank ids count as none.
    #[must_use]
    pub fn reply_to(&self) -> Option<&str> {
        self.source_message_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Fields needed to insert a freshly generated draft.
#[derive(Debug, Clone)]
pub struct NewDraft {
    /// Owning user.
    pub user_id: UserId,
    /// Transport id of the message being replied to.
    pub source_message_id: Option<String>,
    /// Transport thread of the source message.
    pub thread_id: Option<String>,
    /// Tone label.
    pub tone: String,
    /// Reply text.
    pub draft_text: String,
    /// Retry budget.
    pub max_attempts: u32,
}
