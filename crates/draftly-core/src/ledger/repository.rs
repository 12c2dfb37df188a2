//! Attempt ledger storage.
//!
//! Attempts are appended in `STARTED` and resolved exactly once; resolving
//! updates are guarded on `STARTED` so a finished row never changes again.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::model::{SendAttempt, SendStatus};
use crate::store::{decode_opt_ts, decode_ts, encode_ts};
use crate::{DraftId, Error, Result};

fn from_row(row: &SqliteRow) -> Result<SendAttempt> {
    let status: String = row.try_get("status")?;
    let status = SendStatus::parse(&status)
        .ok_or_else(|| Error::Corrupt(format!("unknown attempt status {status:?}")))?;

    Ok(SendAttempt {
        id: row.try_get("id")?,
        draft_id: DraftId(row.try_get("draft_id")?),
        attempt_no: row.try_get("attempt_no")?,
        status,
        transport_message_id: row.try_get("transport_message_id")?,
        error_code: row.try_get("error_code")?,
        error_message: row.try_get("error_message")?,
        started_at: decode_ts(&row.try_get::<String, _>("started_at")?)?,
        finished_at: decode_opt_ts(row.try_get("finished_at")?)?,
    })
}

/// Number of attempts recorded for a draft.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn count_for_draft(conn: &mut SqliteConnection, draft_id: DraftId) -> Result<u32> {
    let count: u32 = sqlx::query_scalar("SELECT COUNT(*) FROM send_attempts WHERE draft_id = ?")
        .bind(draft_id.0)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Append a `STARTED` attempt numbered `count + 1`.
///
/// # Errors
///
/// Returns an error if the database query fails. A concurrent writer that
/// took the same number surfaces as a unique-constraint violation.
pub async fn start(
    conn: &mut SqliteConnection,
    draft_id: DraftId,
    now: DateTime<Utc>,
) -> Result<SendAttempt> {
    let attempt_no = count_for_draft(&mut *conn, draft_id).await? + 1;
    let started_at = encode_ts(now);

    let result = sqlx::query(
        r"
        INSERT INTO send_attempts (draft_id, attempt_no, status, started_at)
        VALUES (?, ?, 'STARTED', ?)
        ",
    )
    .bind(draft_id.0)
    .bind(attempt_no)
    .bind(&started_at)
    .execute(conn)
    .await?;

    Ok(SendAttempt {
        id: result.last_insert_rowid(),
        draft_id,
        attempt_no,
        status: SendStatus::Started,
        transport_message_id: None,
        error_code: None,
        error_message: None,
        started_at: now,
        finished_at: None,
    })
}

/// Resolve an attempt as `SUCCEEDED`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn succeed(
    conn: &mut SqliteConnection,
    attempt_id: i64,
    transport_message_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE send_attempts
        SET status = 'SUCCEEDED', transport_message_id = ?, finished_at = ?
        WHERE id = ? AND status = 'STARTED'
        ",
    )
    .bind(transport_message_id)
    .bind(encode_ts(now))
    .bind(attempt_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Resolve an attempt as `FAILED`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn fail(
    conn: &mut SqliteConnection,
    attempt_id: i64,
    error_code: &str,
    error_message: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE send_attempts
        SET status = 'FAILED', error_code = ?, error_message = ?, finished_at = ?
        WHERE id = ? AND status = 'STARTED'
        ",
    )
    .bind(error_code)
    .bind(error_message)
    .bind(encode_ts(now))
    .bind(attempt_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// All attempts for a draft, by sequence number.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list_for_draft(
    conn: &mut SqliteConnection,
    draft_id: DraftId,
) -> Result<Vec<SendAttempt>> {
    let rows = sqlx::query(
        r"
        SELECT id, draft_id, attempt_no, status, transport_message_id,
               error_code, error_message, started_at, finished_at
        FROM send_attempts
        WHERE draft_id = ?
        ORDER BY attempt_no ASC
        ",
    )
    .bind(draft_id.0)
    .fetch_all(conn)
    .await?;

    rows.iter().map(from_row).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::repository as users;
    use crate::draft::{NewDraft, repository as drafts};
    use crate::store::Store;

    async fn draft_in(conn: &mut SqliteConnection) -> DraftId {
        let user = users::create_user(conn, "ledger@example.com", Utc::now())
            .await
            .unwrap();
        let draft = NewDraft {
            user_id: user.id,
            source_message_id: None,
            thread_id: None,
            tone: "casual".into(),
            draft_text: "hi".into(),
            max_attempts: 3,
        };
        drafts::insert(conn, &draft, Utc::now()).await.unwrap().id
    }

    #[tokio::test]
    async fn test_attempts_are_numbered_sequentially() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.acquire().await.unwrap();
        let draft_id = draft_in(&mut conn).await;

        let first = start(&mut conn, draft_id, Utc::now()).await.unwrap();
        fail(&mut conn, first.id, "transport", "503", Utc::now())
            .await
            .unwrap();
        let second = start(&mut conn, draft_id, Utc::now()).await.unwrap();
        succeed(&mut conn, second.id, "gmail-1", Utc::now())
            .await
            .unwrap();

        assert_eq!(first.attempt_no, 1);
        assert_eq!(second.attempt_no, 2);
        assert_eq!(count_for_draft(&mut conn, draft_id).await.unwrap(), 2);

        let attempts = list_for_draft(&mut conn, draft_id).await.unwrap();
        assert_eq!(attempts[0].status, SendStatus::Failed);
        assert_eq!(attempts[0].error_code.as_deref(), Some("transport"));
        assert_eq!(attempts[1].status, SendStatus::Succeeded);
        assert_eq!(attempts[1].transport_message_id.as_deref(), Some("gmail-1"));
        assert!(attempts.iter().all(|a| a.finished_at.is_some()));
    }

    #[tokio::test]
    async fn test_finished_attempt_is_immutable() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.acquire().await.unwrap();
        let draft_id = draft_in(&mut conn).await;

        let attempt = start(&mut conn, draft_id, Utc::now()).await.unwrap();
        assert!(attempt.is_in_doubt());
        succeed(&mut conn, attempt.id, "gmail-1", Utc::now())
            .await
            .unwrap();
        fail(&mut conn, attempt.id, "transport", "late", Utc::now())
            .await
            .unwrap();

        let attempts = list_for_draft(&mut conn, draft_id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, SendStatus::Succeeded);
        assert!(attempts[0].error_code.is_none());
    }
}
