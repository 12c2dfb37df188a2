//! Credential storage, keyed by (user, provider).

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::model::{AuthProvider, Credential, NewCredential};
use crate::store::{decode_opt_ts, decode_ts, encode_ts};
use crate::{Error, Result, UserId};

const COLUMNS: &str = r"
    id, user_id, provider, access_token, refresh_token_encrypted, scope,
    expires_at, revoked_at, created_at, updated_at
";

fn from_row(row: &SqliteRow) -> Result<Credential> {
    let provider: String = row.try_get("provider")?;

    Ok(Credential {
        id: row.try_get("id")?,
        user_id: UserId(row.try_get("user_id")?),
        provider: AuthProvider::parse(&provider)
            .ok_or_else(|| Error::Corrupt(format!("unknown provider {provider:?}")))?,
        access_token: row.try_get("access_token")?,
        refresh_token_encrypted: row.try_get("refresh_token_encrypted")?,
        scope: row.try_get("scope")?,
        expires_at: decode_opt_ts(row.try_get("expires_at")?)?,
        revoked_at: decode_opt_ts(row.try_get("revoked_at")?)?,
        created_at: decode_ts(&row.try_get::<String, _>("created_at")?)?,
        updated_at: decode_ts(&row.try_get::<String, _>("updated_at")?)?,
    })
}

/// Insert a credential, or update the existing one for the same user and
/// provider in place. A fresh save clears any revocation.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn save(
    conn: &mut SqliteConnection,
    credential: &NewCredential,
    now: DateTime<Utc>,
) -> Result<Credential> {
    let now = encode_ts(now);
    sqlx::query(
        r"
        INSERT INTO credentials
            (user_id, provider, access_token, refresh_token_encrypted, scope,
             expires_at, revoked_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)
        ON CONFLICT(user_id, provider) DO UPDATE SET
            access_token = excluded.access_token,
            refresh_token_encrypted = excluded.refresh_token_encrypted,
            scope = excluded.scope,
            expires_at = excluded.expires_at,
            revoked_at = NULL,
            updated_at = excluded.updated_at
        ",
    )
    .bind(credential.user_id.0)
    .bind(credential.provider.as_str())
    .bind(&credential.access_token)
    .bind(&credential.refresh_token_encrypted)
    .bind(&credential.scope)
    .bind(credential.expires_at.map(encode_ts))
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    debug!(user_id = %credential.user_id, provider = %credential.provider, "saved credential");
    find(conn, credential.user_id, credential.provider)
        .await?
        .ok_or_else(|| Error::not_found("credential", credential.user_id))
}

/// Find the credential for a user and provider.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find(
    conn: &mut SqliteConnection,
    user_id: UserId,
    provider: AuthProvider,
) -> Result<Option<Credential>> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM credentials WHERE user_id = ? AND provider = ?"
    ))
    .bind(user_id.0)
    .bind(provider.as_str())
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(from_row).transpose()
}

/// Persist refreshed token fields of `credential`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn update_tokens(
    conn: &mut SqliteConnection,
    credential: &Credential,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE credentials
        SET access_token = ?, refresh_token_encrypted = ?, scope = ?, expires_at = ?,
            updated_at = ?
        WHERE id = ?
        ",
    )
    .bind(&credential.access_token)
    .bind(&credential.refresh_token_encrypted)
    .bind(&credential.scope)
    .bind(credential.expires_at.map(encode_ts))
    .bind(encode_ts(now))
    .bind(credential.id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Mark the credential for a user and provider revoked.
///
/// Returns `false` if there is no such credential or it was already revoked.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn mark_revoked(
    conn: &mut SqliteConnection,
    user_id: UserId,
    provider: AuthProvider,
    now: DateTime<Utc>,
) -> Result<bool> {
    let now = encode_ts(now);
    let result = sqlx::query(
        r"
        UPDATE credentials SET revoked_at = ?, updated_at = ?
        WHERE user_id = ? AND provider = ? AND revoked_at IS NULL
        ",
    )
    .bind(&now)
    .bind(&now)
    .bind(user_id.0)
    .bind(provider.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
