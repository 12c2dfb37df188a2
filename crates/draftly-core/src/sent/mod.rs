//! Sent-record store.
//!
//! At most one row per draft. Its presence is the proof that the transport
//! accepted the message, whatever the draft's status says.

pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DraftId;

/// Idempotency witness for a dispatched draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    /// Row identifier.
    pub id: i64,
    /// Draft that was sent.
    pub draft_id: DraftId,
    /// Transport id of the dispatched message.
    pub transport_message_id: String,
    /// Transport thread the message landed in.
    pub transport_thread_id: Option<String>,
    /// When the transport accepted it.
    pub sent_at: DateTime<Utc>,
}
