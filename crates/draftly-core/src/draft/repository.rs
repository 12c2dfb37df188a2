//! Draft storage.
//!
//! Every status change is a conditional update on the expected source
//! states, so a caller that lost a race sees `false` instead of silently
//! overwriting another transition.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::debug;

use super::model::{Draft, DraftId, DraftStatus, NewDraft};
use crate::store::{decode_opt_ts, decode_ts, encode_ts};
use crate::{Error, Result, UserId};

const COLUMNS: &str = r"
    id, user_id, source_message_id, thread_id, tone, draft_text, status,
    attempts, max_attempts, last_error, created_at, updated_at,
    approved_at, rejected_at, sent_at
";

fn from_row(row: &SqliteRow) -> Result<Draft> {
    let status: String = row.try_get("status")?;
    let status = DraftStatus::parse(&status)
        .ok_or_else(|| Error::Corrupt(format!("unknown draft status {status:?}")))?;

    Ok(Draft {
        id: DraftId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        source_message_id: row.try_get("source_message_id")?,
        thread_id: row.try_get("thread_id")?,
        tone: row.try_get("tone")?,
        draft_text: row.try_get("draft_text")?,
        status,
        attempts: row.try_get("attempts")?,
        max_attempts: row.try_get("max_attempts")?,
        last_error: row.try_get("last_error")?,
        created_at: decode_ts(&row.try_get::<String, _>("created_at")?)?,
        updated_at: decode_ts(&row.try_get::<String, _>("updated_at")?)?,
        approved_at: decode_opt_ts(row.try_get("approved_at")?)?,
        rejected_at: decode_opt_ts(row.try_get("rejected_at")?)?,
        sent_at: decode_opt_ts(row.try_get("sent_at")?)?,
    })
}

/// Insert a new draft in `PENDING`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn insert(
    conn: &mut SqliteConnection,
    draft: &NewDraft,
    now: DateTime<Utc>,
) -> Result<Draft> {
    let now = encode_ts(now);
    let result = sqlx::query(
        r"
        INSERT INTO drafts
            (user_id, source_message_id, thread_id, tone, draft_text, status,
             attempts, max_attempts, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        ",
    )
    .bind(draft.user_id.0)
    .bind(&draft.source_message_id)
    .bind(&draft.thread_id)
    .bind(&draft.tone)
    .bind(&draft.draft_text)
    .bind(DraftStatus::Pending.as_str())
    .bind(draft.max_attempts)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    let id = DraftId(result.last_insert_rowid());
    debug!(draft_id = %id, user_id = %draft.user_id, "inserted draft");
    get(conn, id).await
}

/// Find a draft by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find(conn: &mut SqliteConnection, id: DraftId) -> Result<Option<Draft>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM drafts WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Load a draft by ID.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the draft does not exist.
pub async fn get(conn: &mut SqliteConnection, id: DraftId) -> Result<Draft> {
    find(conn, id)
        .await?
        .ok_or_else(|| Error::not_found("draft", id))
}

/// List a user's drafts, newest first.
///
/// An empty `statuses` slice matches every status.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
    statuses: &[DraftStatus],
    limit: u32,
) -> Result<Vec<Draft>> {
    let mut query: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM drafts WHERE user_id = "));
    query.push_bind(user_id.0);

    if !statuses.is_empty() {
        query.push(" AND status IN (");
        let mut separated = query.separated(", ");
        for status in statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")");
    }

    query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    query.push_bind(limit);

    let rows = query.build().fetch_all(conn).await?;
    rows.iter().map(from_row).collect()
}

/// Oldest `APPROVED`/`FAILED` drafts that still have attempts left.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_retryable(conn: &mut SqliteConnection, limit: u32) -> Result<Vec<Draft>> {
    let rows = sqlx::query(&format!(
        r"
        SELECT {COLUMNS} FROM drafts
        WHERE status IN ('APPROVED', 'FAILED') AND attempts < max_attempts
        ORDER BY created_at ASC, id ASC
        LIMIT ?
        "
    ))
    .bind(limit)
    .fetch_all(conn)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Replace the text of a `PENDING`/`EDITED` draft and mark it `EDITED`.
///
/// Returns `false` if the draft was not in an editable status.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn update_text(
    conn: &mut SqliteConnection,
    id: DraftId,
    text: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r"
        UPDATE drafts SET draft_text = ?, status = 'EDITED', updated_at = ?
        WHERE id = ? AND status IN ('PENDING', 'EDITED')
        ",
    )
    .bind(text)
    .bind(encode_ts(now))
    .bind(id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move a `PENDING`/`EDITED` draft to `APPROVED`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn mark_approved(
    conn: &mut SqliteConnection,
    id: DraftId,
    now: DateTime<Utc>,
) -> Result<bool> {
    let now = encode_ts(now);
    let result = sqlx::query(
        r"
        UPDATE drafts SET status = 'APPROVED', approved_at = ?, updated_at = ?
        WHERE id = ? AND status IN ('PENDING', 'EDITED')
        ",
    )
    .bind(&now)
    .bind(&now)
    .bind(id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move any draft that is not `SENT` to `REJECTED`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn mark_rejected(
    conn: &mut SqliteConnection,
    id: DraftId,
    now: DateTime<Utc>,
) -> Result<bool> {
    let now = encode_ts(now);
    let result = sqlx::query(
        r"
        UPDATE drafts SET status = 'REJECTED', rejected_at = ?, updated_at = ?
        WHERE id = ? AND status <> 'SENT'
        ",
    )
    .bind(&now)
    .bind(&now)
    .bind(id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Claim an `APPROVED`/`FAILED` draft for sending: status becomes `SENDING`
/// and `attempts` goes up by one.
///
/// Returns `false` if another caller already moved the draft on.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn claim_for_send(
    conn: &mut SqliteConnection,
    id: DraftId,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r"
        UPDATE drafts SET status = 'SENDING', attempts = attempts + 1, updated_at = ?
        WHERE id = ? AND status IN ('APPROVED', 'FAILED')
        ",
    )
    .bind(encode_ts(now))
    .bind(id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark a draft `SENT`.
///
/// Keeps an existing `sent_at`, so re-running this after a crash does not
/// move the recorded send time.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn mark_sent(
    conn: &mut SqliteConnection,
    id: DraftId,
    sent_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE drafts
        SET status = 'SENT', sent_at = COALESCE(sent_at, ?), last_error = NULL, updated_at = ?
        WHERE id = ?
        ",
    )
    .bind(encode_ts(sent_at))
    .bind(encode_ts(now))
    .bind(id.0)
    .execute(conn)
    .await?;

    Ok(())
}

/// Move a `SENDING` draft to `FAILED` with the error shown to the user.
///
/// Returns `false` if the draft left `SENDING` while the send was in
/// flight, e.g. because it was rejected.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn mark_failed(
    conn: &mut SqliteConnection,
    id: DraftId,
    error: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r"
        UPDATE drafts SET status = 'FAILED', last_error = ?, updated_at = ?
        WHERE id = ? AND status = 'SENDING'
        ",
    )
    .bind(error)
    .bind(encode_ts(now))
    .bind(id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
