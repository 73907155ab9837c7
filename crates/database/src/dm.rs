//! Direct-message conversation storage.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DatabaseError;
use crate::models::DmMessage;

/// Append one conversation turn. `role` is "user" or "assistant".
pub async fn store_dm_message(
    pool: &SqlitePool,
    user_id: &str,
    role: &str,
    content: &str,
    origin_timestamp: Option<i64>,
) -> Result<i64, DatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO dm_conversations (user_id, role, content, origin_timestamp)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(role)
    .bind(content)
    .bind(origin_timestamp)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Conversation history for a user, oldest first, up to `limit` turns.
pub async fn history(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<DmMessage>, DatabaseError> {
    let turns = sqlx::query_as::<_, DmMessage>(
        r#"
        SELECT id, user_id, role, content, origin_timestamp, created_at
        FROM (
            SELECT id, user_id, role, content, origin_timestamp, created_at
            FROM dm_conversations
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
        )
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(turns)
}

/// Users with stored conversation turns.
pub async fn user_ids(pool: &SqlitePool) -> Result<Vec<String>, DatabaseError> {
    let ids = sqlx::query_scalar::<_, String>("SELECT DISTINCT user_id FROM dm_conversations")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Delete a user's turns stored more than `older_than_hours` ago.
pub async fn purge_for_user(
    pool: &SqlitePool,
    user_id: &str,
    older_than_hours: i64,
) -> Result<u64, DatabaseError> {
    let modifier = format!("-{} hours", older_than_hours);
    let result = sqlx::query(
        r#"
        DELETE FROM dm_conversations
        WHERE user_id = ? AND created_at < datetime('now', ?)
        "#,
    )
    .bind(user_id)
    .bind(&modifier)
    .execute(pool)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        debug!(user_id, deleted, "Purged expired DM turns");
    }
    Ok(deleted)
}

/// Delete all of a user's turns, for an explicit forget request.
pub async fn purge_all_for_user(pool: &SqlitePool, user_id: &str) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM dm_conversations WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
