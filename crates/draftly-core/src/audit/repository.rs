//! Audit log storage. Rows are only ever inserted.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::model::{Actor, DraftAction, DraftLog};
use crate::store::{decode_ts, encode_ts};
use crate::{DraftId, Error, Result};

fn from_row(row: &SqliteRow) -> Result<DraftLog> {
    let actor: String = row.try_get("actor")?;
    let action: String = row.try_get("action")?;
    let meta: String = row.try_get("meta")?;

    Ok(DraftLog {
        id: row.try_get("id")?,
        draft_id: DraftId(row.try_get("draft_id")?),
        actor: Actor::parse(&actor)
            .ok_or_else(|| Error::Corrupt(format!("unknown actor {actor:?}")))?,
        action: DraftAction::parse(&action)
            .ok_or_else(|| Error::Corrupt(format!("unknown action {action:?}")))?,
        meta: serde_json::from_str(&meta)?,
        created_at: decode_ts(&row.try_get::<String, _>("created_at")?)?,
    })
}

/// Append an entry.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn append(
    conn: &mut SqliteConnection,
    draft_id: DraftId,
    actor: Actor,
    action: DraftAction,
    meta: &serde_json::Value,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO draft_logs (draft_id, actor, action, meta, created_at)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(draft_id.0)
    .bind(actor.as_str())
    .bind(action.as_str())
    .bind(serde_json::to_string(meta)?)
    .bind(encode_ts(now))
    .execute(conn)
    .await?;

    Ok(())
}

/// The full trail for a draft, oldest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list_for_draft(
    conn: &mut SqliteConnection,
    draft_id: DraftId,
) -> Result<Vec<DraftLog>> {
    let rows = sqlx::query(
        r"
        SELECT id, draft_id, actor, action, meta, created_at
        FROM draft_logs
        WHERE draft_id = ?
        ORDER BY id ASC
        ",
    )
    .bind(draft_id.0)
    .fetch_all(conn)
    .await?;

    rows.iter().map(from_row).collect()
}
