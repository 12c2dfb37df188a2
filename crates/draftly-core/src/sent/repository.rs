//! Sent-record storage.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::SentMessage;
use crate::store::{decode_ts, encode_ts};
use crate::{DraftId, Result};

fn from_row(row: &SqliteRow) -> Result<SentMessage> {
    Ok(SentMessage {
        id: row.try_get("id")?,
        draft_id: DraftId(row.try_get("draft_id")?),
        transport_message_id: row.try_get("transport_message_id")?,
        transport_thread_id: row.try_get("transport_thread_id")?,
        sent_at: decode_ts(&row.try_get::<String, _>("sent_at")?)?,
    })
}

/// Whether a sent record exists for the draft.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn exists_for_draft(conn: &mut SqliteConnection, draft_id: DraftId) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sent_messages WHERE draft_id = ?)")
            .bind(draft_id.0)
            .fetch_one(conn)
            .await?;
    Ok(exists)
}

/// The sent record for a draft, if any.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_for_draft(
    conn: &mut SqliteConnection,
    draft_id: DraftId,
) -> Result<Option<SentMessage>> {
    let row = sqlx::query(
        r"
        SELECT id, draft_id, transport_message_id, transport_thread_id, sent_at
        FROM sent_messages
        WHERE draft_id = ?
        ",
    )
    .bind(draft_id.0)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(from_row).transpose()
}

/// Record that the transport accepted the draft.
///
/// Returns `None` when a record already exists for the draft: another
/// caller won the race and its row stands.
///
/// # Errors
///
/// Returns an error if the database query fails for any other reason.
pub async fn record(
    conn: &mut SqliteConnection,
    draft_id: DraftId,
    transport_message_id: &str,
    transport_thread_id: Option<&str>,
    sent_at: DateTime<Utc>,
) -> Result<Option<SentMessage>> {
    let result = sqlx::query(
        r"
        INSERT INTO sent_messages (draft_id, transport_message_id, transport_thread_id, sent_at)
        VALUES (?, ?, ?, ?)
        ",
    )
    .bind(draft_id.0)
    .bind(transport_message_id)
    .bind(transport_thread_id)
    .bind(encode_ts(sent_at))
    .execute(conn)
    .await;

    match result {
        Ok(done) => Ok(Some(SentMessage {
            id: done.last_insert_rowid(),
            draft_id,
            transport_message_id: transport_message_id.to_string(),
            transport_thread_id: transport_thread_id.map(str::to_string),
            sent_at,
        })),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!(draft_id = %draft_id, "sent record already present");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
