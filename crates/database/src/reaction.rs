//! Reaction storage. One live reaction per (message, reactor).

use sqlx::SqlitePool;

use crate::error::DatabaseError;
use crate::models::Reaction;

/// Record a reaction, replacing the reactor's previous emoji on the same
/// message if any. Returns whether a new row was created, which doubles as
/// the duplicate-delivery signal for ingestion counters.
pub async fn upsert_reaction(
    pool: &SqlitePool,
    message_id: i64,
    emoji: &str,
    reactor_id: &str,
    timestamp: i64,
) -> Result<bool, DatabaseError> {
    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM reactions WHERE message_id = ? AND reactor_id = ?",
    )
    .bind(message_id)
    .bind(reactor_id)
    .fetch_optional(&mut *tx)
    .await?;

    let is_new = match existing {
        Some(id) => {
            sqlx::query("UPDATE reactions SET emoji = ?, timestamp = ? WHERE id = ?")
                .bind(emoji)
                .bind(timestamp)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            false
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO reactions (message_id, emoji, reactor_id, timestamp)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(message_id)
            .bind(emoji)
            .bind(reactor_id)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?;
            true
        }
    };

    tx.commit().await?;
    Ok(is_new)
}

/// Remove a reactor's reaction from a message. Returns whether a row existed.
pub async fn remove_reaction(
    pool: &SqlitePool,
    message_id: i64,
    reactor_id: &str,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM reactions WHERE message_id = ? AND reactor_id = ?")
        .bind(message_id)
        .bind(reactor_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All reactions on a message, oldest first.
pub async fn reactions_for_message(
    pool: &SqlitePool,
    message_id: i64,
) -> Result<Vec<Reaction>, DatabaseError> {
    let reactions = sqlx::query_as::<_, Reaction>(
        r#"
        SELECT id, message_id, emoji, reactor_id, timestamp
        FROM reactions WHERE message_id = ? ORDER BY timestamp ASC
        "#,
    )
    .bind(message_id)
    .fetch_all(pool)
    .await?;
    Ok(reactions)
}
