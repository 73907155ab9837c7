//! Group message storage, windowed reads, and purging.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DatabaseError;
use crate::format_utc;
use crate::models::{Message, MessageWithReactions};

/// Store a message, deduplicating on (origin_timestamp, sender_id, group_id).
///
/// Returns the row id and whether the row was newly inserted. A duplicate
/// delivery returns the existing id with `is_new = false` and changes
/// nothing, so replays are harmless.
pub async fn store_message(
    pool: &SqlitePool,
    origin_timestamp: i64,
    sender_id: &str,
    group_id: &str,
    content: Option<&str>,
) -> Result<(i64, bool), DatabaseError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO messages (origin_timestamp, sender_id, group_id, content)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(origin_timestamp, sender_id, group_id) DO NOTHING
        "#,
    )
    .bind(origin_timestamp)
    .bind(sender_id)
    .bind(group_id)
    .bind(content)
    .execute(&mut *tx)
    .await?;

    let (id, is_new) = if result.rows_affected() > 0 {
        (result.last_insert_rowid(), true)
    } else {
        let id: i64 = sqlx::query_scalar(
            r#"
            SELECT id FROM messages
            WHERE origin_timestamp = ? AND sender_id = ? AND group_id = ?
            "#,
        )
        .bind(origin_timestamp)
        .bind(sender_id)
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;
        (id, false)
    };

    tx.commit().await?;
    Ok((id, is_new))
}

/// Locate a stored message by origin identity within a group, trying the
/// exact sender first and falling back to timestamp-only. Reaction targets
/// sometimes arrive with an author id in a different format than the stored
/// sender id, so the fallback keeps those reactions attachable.
pub async fn find_by_origin(
    pool: &SqlitePool,
    group_id: &str,
    origin_timestamp: i64,
    sender_id: Option<&str>,
) -> Result<Option<Message>, DatabaseError> {
    if let Some(sender) = sender_id {
        let exact = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, origin_timestamp, sender_id, group_id, content, stored_at
            FROM messages
            WHERE group_id = ? AND origin_timestamp = ? AND sender_id = ?
            "#,
        )
        .bind(group_id)
        .bind(origin_timestamp)
        .bind(sender)
        .fetch_optional(pool)
        .await?;
        if exact.is_some() {
            return Ok(exact);
        }
    }

    let message = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, origin_timestamp, sender_id, group_id, content, stored_at
        FROM messages
        WHERE group_id = ? AND origin_timestamp = ?
        "#,
    )
    .bind(group_id)
    .bind(origin_timestamp)
    .fetch_optional(pool)
    .await?;
    Ok(message)
}

/// Messages for a group within an optional origin-timestamp window
/// (epoch milliseconds, inclusive), oldest first.
pub async fn messages_for_group(
    pool: &SqlitePool,
    group_id: &str,
    since_ms: Option<i64>,
    until_ms: Option<i64>,
) -> Result<Vec<Message>, DatabaseError> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, origin_timestamp, sender_id, group_id, content, stored_at
        FROM messages
        WHERE group_id = ?
          AND (? IS NULL OR origin_timestamp >= ?)
          AND (? IS NULL OR origin_timestamp <= ?)
        ORDER BY origin_timestamp ASC
        "#,
    )
    .bind(group_id)
    .bind(since_ms)
    .bind(since_ms)
    .bind(until_ms)
    .bind(until_ms)
    .fetch_all(pool)
    .await?;
    Ok(messages)
}

/// Messages in a window joined with their reaction totals, oldest first.
///
/// Rows without text content are skipped; the summarizer only consumes
/// textual messages.
pub async fn messages_with_reactions(
    pool: &SqlitePool,
    group_id: &str,
    since_ms: Option<i64>,
    until_ms: Option<i64>,
) -> Result<Vec<MessageWithReactions>, DatabaseError> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.content, m.sender_id, m.origin_timestamp, r.emoji
        FROM messages m
        LEFT JOIN reactions r ON r.message_id = m.id
        WHERE m.group_id = ?
          AND m.content IS NOT NULL AND m.content != ''
          AND (? IS NULL OR m.origin_timestamp >= ?)
          AND (? IS NULL OR m.origin_timestamp <= ?)
        ORDER BY m.origin_timestamp ASC, m.id ASC
        "#,
    )
    .bind(group_id)
    .bind(since_ms)
    .bind(since_ms)
    .bind(until_ms)
    .bind(until_ms)
    .fetch_all(pool)
    .await?;

    // One row per (message, reaction); fold adjacent rows of the same
    // message into a single record.
    let mut out: Vec<MessageWithReactions> = Vec::new();
    let mut last_id: Option<i64> = None;
    for row in rows {
        let id: i64 = row.try_get("id")?;
        let emoji: Option<String> = row.try_get("emoji")?;

        if last_id != Some(id) {
            out.push(MessageWithReactions {
                content: row.try_get("content")?,
                sender_id: row.try_get("sender_id")?,
                origin_timestamp: row.try_get("origin_timestamp")?,
                reaction_count: 0,
                emojis: Vec::new(),
            });
            last_id = Some(id);
        }
        if let (Some(emoji), Some(current)) = (emoji, out.last_mut()) {
            current.reaction_count += 1;
            current.emojis.push(emoji);
        }
    }
    Ok(out)
}

/// Count stored messages per group.
pub async fn count_by_group(pool: &SqlitePool) -> Result<Vec<(String, i64)>, DatabaseError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT group_id, COUNT(*) FROM messages GROUP BY group_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Group ids that currently have stored messages.
pub async fn group_ids_with_messages(pool: &SqlitePool) -> Result<Vec<String>, DatabaseError> {
    let ids = sqlx::query_scalar::<_, String>("SELECT DISTINCT group_id FROM messages")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Delete messages for a group stored more than `older_than_hours` ago.
/// Reactions cascade with their messages. Returns the number deleted.
pub async fn purge_for_group(
    pool: &SqlitePool,
    group_id: &str,
    older_than_hours: i64,
) -> Result<u64, DatabaseError> {
    let modifier = format!("-{} hours", older_than_hours);
    let result = sqlx::query(
        r#"
        DELETE FROM messages
        WHERE group_id = ? AND stored_at < datetime('now', ?)
        "#,
    )
    .bind(group_id)
    .bind(&modifier)
    .execute(pool)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        debug!(group_id, deleted, "Purged expired messages");
    }
    Ok(deleted)
}

/// Delete messages for a group with origin timestamps at or before `before`.
/// Used by purge-on-summary to drop exactly the summarized window and
/// everything older, leaving newer messages for the next run.
pub async fn purge_for_group_through(
    pool: &SqlitePool,
    group_id: &str,
    before: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        r#"
        DELETE FROM messages
        WHERE group_id = ? AND origin_timestamp <= ?
        "#,
    )
    .bind(group_id)
    .bind(before.timestamp_millis())
    .execute(pool)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        debug!(group_id, deleted, through = %format_utc(before), "Purged summarized messages");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{group, reaction, test_db};

    async fn seed_group(pool: &SqlitePool, id: &str) {
        group::upsert_group(pool, id, "test", "").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_delivery_is_idempotent() {
        let db = test_db().await;
        seed_group(db.pool(), "g1").await;

        let (id1, new1) = store_message(db.pool(), 1000, "alice", "g1", Some("hi"))
            .await
            .unwrap();
        let (id2, new2) = store_message(db.pool(), 1000, "alice", "g1", Some("hi"))
            .await
            .unwrap();

        assert!(new1);
        assert!(!new2);
        assert_eq!(id1, id2);

        let all = messages_for_group(db.pool(), "g1", None, None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn same_timestamp_different_sender_both_stored() {
        let db = test_db().await;
        seed_group(db.pool(), "g1").await;

        store_message(db.pool(), 1000, "alice", "g1", Some("a")).await.unwrap();
        store_message(db.pool(), 1000, "bob", "g1", Some("b")).await.unwrap();

        let all = messages_for_group(db.pool(), "g1", None, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let db = test_db().await;
        seed_group(db.pool(), "g1").await;

        for ts in [100, 200, 300, 400] {
            store_message(db.pool(), ts, "alice", "g1", Some("m")).await.unwrap();
        }

        let windowed = messages_for_group(db.pool(), "g1", Some(200), Some(300))
            .await
            .unwrap();
        let stamps: Vec<i64> = windowed.iter().map(|m| m.origin_timestamp).collect();
        assert_eq!(stamps, vec![200, 300]);
    }

    #[tokio::test]
    async fn reactions_fold_into_message_rows() {
        let db = test_db().await;
        seed_group(db.pool(), "g1").await;

        let (id, _) = store_message(db.pool(), 100, "alice", "g1", Some("popular"))
            .await
            .unwrap();
        store_message(db.pool(), 200, "bob", "g1", Some("quiet")).await.unwrap();
        store_message(db.pool(), 300, "carol", "g1", None).await.unwrap();

        reaction::upsert_reaction(db.pool(), id, "👍", "bob", 150).await.unwrap();
        reaction::upsert_reaction(db.pool(), id, "🎉", "carol", 160).await.unwrap();

        let rows = messages_with_reactions(db.pool(), "g1", None, None).await.unwrap();
        assert_eq!(rows.len(), 2, "empty-content row is excluded");
        assert_eq!(rows[0].content, "popular");
        assert_eq!(rows[0].reaction_count, 2);
        assert_eq!(rows[0].emojis.len(), 2);
        assert_eq!(rows[1].reaction_count, 0);
    }

    #[tokio::test]
    async fn origin_lookup_falls_back_to_timestamp_only() {
        let db = test_db().await;
        seed_group(db.pool(), "g1").await;
        store_message(db.pool(), 555, "uuid-alice", "g1", Some("m")).await.unwrap();

        let hit = find_by_origin(db.pool(), "g1", 555, Some("+15551234"))
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = find_by_origin(db.pool(), "g1", 556, None).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn purge_through_cascades_reactions() {
        let db = test_db().await;
        seed_group(db.pool(), "g1").await;

        let now = Utc::now();
        let old_ms = (now - chrono::Duration::hours(5)).timestamp_millis();
        let new_ms = now.timestamp_millis();

        let (old_id, _) = store_message(db.pool(), old_ms, "alice", "g1", Some("old"))
            .await
            .unwrap();
        store_message(db.pool(), new_ms, "alice", "g1", Some("new")).await.unwrap();
        reaction::upsert_reaction(db.pool(), old_id, "👍", "bob", old_ms).await.unwrap();

        let deleted = purge_for_group_through(db.pool(), "g1", now - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining = messages_for_group(db.pool(), "g1", None, None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content.as_deref(), Some("new"));

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reactions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn age_purge_only_removes_expired_rows() {
        let db = test_db().await;
        seed_group(db.pool(), "g1").await;

        store_message(db.pool(), 1, "alice", "g1", Some("fresh")).await.unwrap();
        // Backdate one row past a 2 hour window.
        sqlx::query("UPDATE messages SET stored_at = datetime('now', '-3 hours') WHERE origin_timestamp = 1")
            .execute(db.pool())
            .await
            .unwrap();
        store_message(db.pool(), 2, "alice", "g1", Some("new")).await.unwrap();

        let deleted = purge_for_group(db.pool(), "g1", 2).await.unwrap();
        assert_eq!(deleted, 1);
        let deleted_again = purge_for_group(db.pool(), "g1", 2).await.unwrap();
        assert_eq!(deleted_again, 0, "purge is idempotent");
    }
}
