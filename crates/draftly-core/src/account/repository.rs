//! User and preference storage.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::model::{User, UserId, UserPreference};
use crate::store::{decode_ts, encode_ts};
use crate::{Error, Result};

fn from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        email: row.try_get("email")?,
        created_at: decode_ts(&row.try_get::<String, _>("created_at")?)?,
    })
}

/// Create a user.
///
/// # Errors
///
/// Returns an error if the database query fails or the email is taken.
pub async fn create_user(
    conn: &mut SqliteConnection,
    email: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    let result = sqlx::query("INSERT INTO users (email, created_at) VALUES (?, ?)")
        .bind(email)
        .bind(encode_ts(now))
        .execute(conn)
        .await?;

    let id = UserId(result.last_insert_rowid());
    debug!(user_id = %id, "created user");
    Ok(User {
        id,
        email: email.to_string(),
        created_at: now,
    })
}

/// Find a user by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_user(conn: &mut SqliteConnection, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, created_at FROM users WHERE id = ?")
        .bind(id.0)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Load a user by ID.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the user does not exist.
pub async fn get_user(conn: &mut SqliteConnection, id: UserId) -> Result<User> {
    find_user(conn, id)
        .await?
        .ok_or_else(|| Error::not_found("user", id))
}

/// Find a user by mailbox address (case-insensitive).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, created_at FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Insert or replace a user's preferences.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn upsert_preference(
    conn: &mut SqliteConnection,
    user_id: UserId,
    preference: &UserPreference,
    now: DateTime<Utc>,
) -> Result<()> {
    let now = encode_ts(now);
    sqlx::query(
        r"
        INSERT INTO user_preferences
            (user_id, default_tone, signature, style_learning_enabled, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            default_tone = excluded.default_tone,
            signature = excluded.signature,
            style_learning_enabled = excluded.style_learning_enabled,
            updated_at = excluded.updated_at
        ",
    )
    .bind(user_id.0)
    .bind(&preference.default_tone)
    .bind(&preference.signature)
    .bind(preference.style_learning_enabled)
    .bind(&now)
    .bind(&now)
    .execute(conn)
    .await?;

    Ok(())
}

/// A user's preferences, if any were stored.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_preference(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Option<UserPreference>> {
    let row = sqlx::query(
        r"
        SELECT default_tone, signature, style_learning_enabled
        FROM user_preferences
        WHERE user_id = ?
        ",
    )
    .bind(user_id.0)
    .fetch_optional(conn)
    .await?;

    row.map(|row| {
        Ok(UserPreference {
            default_tone: row.try_get("default_tone")?,
            signature: row.try_get("signature")?,
            style_learning_enabled: row.try_get("style_learning_enabled")?,
        })
    })
    .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[tokio::test]
    async fn test_user_lookup() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.acquire().await.unwrap();

        let user = create_user(&mut conn, "Alice@Example.com", Utc::now())
            .await
            .unwrap();
        assert_eq!(get_user(&mut conn, user.id).await.unwrap(), user);

        let by_email = find_user_by_email(&mut conn, "alice@example.com")
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        let err = get_user(&mut conn, UserId(404)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }));

        let duplicate = create_user(&mut conn, "alice@example.com", Utc::now()).await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_preference_upsert() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.acquire().await.unwrap();
        let user = create_user(&mut conn, "prefs@example.com", Utc::now())
            .await
            .unwrap();

        assert!(find_preference(&mut conn, user.id).await.unwrap().is_none());

        let mut prefs = UserPreference {
            default_tone: Some("formal".into()),
            signature: Some("— Bot".into()),
            style_learning_enabled: false,
        };
        upsert_preference(&mut conn, user.id, &prefs, Utc::now())
            .await
            .unwrap();

        prefs.default_tone = Some("casual".into());
        prefs.style_learning_enabled = true;
        upsert_preference(&mut conn, user.id, &prefs, Utc::now())
            .await
            .unwrap();

        let stored = find_preference(&mut conn, user.id).await.unwrap().unwrap();
        assert_eq!(stored, prefs);
    }
}
