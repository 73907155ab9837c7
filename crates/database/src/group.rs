//! Group registry operations.

use sqlx::SqlitePool;

use crate::error::DatabaseError;
use crate::models::Group;

/// Insert or refresh a group record from transport metadata.
pub async fn upsert_group(
    pool: &SqlitePool,
    group_id: &str,
    name: &str,
    description: &str,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO groups (group_id, name, description)
        VALUES (?, ?, ?)
        ON CONFLICT(group_id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            updated_at = datetime('now')
        "#,
    )
    .bind(group_id)
    .bind(name)
    .bind(description)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch a group by its transport identifier.
pub async fn get_group(pool: &SqlitePool, group_id: &str) -> Result<Group, DatabaseError> {
    find_group(pool, group_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Group", group_id))
}

/// Fetch a group if present.
pub async fn find_group(pool: &SqlitePool, group_id: &str) -> Result<Option<Group>, DatabaseError> {
    let group = sqlx::query_as::<_, Group>(
        r#"
        SELECT id, group_id, name, description, created_at, updated_at
        FROM groups WHERE group_id = ?
        "#,
    )
    .bind(group_id)
    .fetch_optional(pool)
    .await?;
    Ok(group)
}

/// List all known groups, newest first.
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<Group>, DatabaseError> {
    let groups = sqlx::query_as::<_, Group>(
        r#"
        SELECT id, group_id, name, description, created_at, updated_at
        FROM groups ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db;

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let db = test_db().await;

        upsert_group(db.pool(), "grp-1", "Team", "").await.unwrap();
        let g = get_group(db.pool(), "grp-1").await.unwrap();
        assert_eq!(g.name, "Team");

        upsert_group(db.pool(), "grp-1", "Team Renamed", "topic")
            .await
            .unwrap();
        let g = get_group(db.pool(), "grp-1").await.unwrap();
        assert_eq!(g.name, "Team Renamed");
        assert_eq!(g.description, "topic");

        assert_eq!(list_groups(db.pool()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_group_is_not_found() {
        let db = test_db().await;
        let err = get_group(db.pool(), "nope").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
