//! Per-group and per-user retention settings.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DatabaseError;
use crate::models::{DmSettings, GroupSettings, PowerMode, RetentionSource};
use crate::validation::validate_retention_hours;

fn settings_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<GroupSettings, DatabaseError> {
    let source: String = row.try_get("source")?;
    let power_mode: String = row.try_get("power_mode")?;
    Ok(GroupSettings {
        group_id: row.try_get("group_id")?,
        retention_hours: row.try_get("retention_hours")?,
        source: RetentionSource::parse(&source)?,
        power_mode: PowerMode::parse(&power_mode)?,
        purge_on_summary: row.try_get("purge_on_summary")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Fetch explicit settings for a group, if any exist.
pub async fn get_group_settings(
    pool: &SqlitePool,
    group_id: &str,
) -> Result<Option<GroupSettings>, DatabaseError> {
    let row = sqlx::query(
        r#"
        SELECT group_id, retention_hours, source, power_mode, purge_on_summary, updated_at
        FROM group_settings WHERE group_id = ?
        "#,
    )
    .bind(group_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(settings_from_row).transpose()
}

/// Set a group's retention window.
///
/// A `Signal` write never overwrites a `Command` value: once a human pins
/// the retention, the disappearing-message timer stops tracking it.
pub async fn set_group_retention(
    pool: &SqlitePool,
    group_id: &str,
    hours: i64,
    source: RetentionSource,
) -> Result<bool, DatabaseError> {
    validate_retention_hours(hours)?;

    let result = sqlx::query(
        r#"
        INSERT INTO group_settings (group_id, retention_hours, source)
        VALUES (?, ?, ?)
        ON CONFLICT(group_id) DO UPDATE SET
            retention_hours = excluded.retention_hours,
            source = excluded.source,
            updated_at = datetime('now')
        WHERE excluded.source = 'command' OR group_settings.source = 'signal'
        "#,
    )
    .bind(group_id)
    .bind(hours)
    .bind(source.as_str())
    .execute(pool)
    .await?;

    let applied = result.rows_affected() > 0;
    if applied {
        debug!(group_id, hours, source = source.as_str(), "Group retention set");
    }
    Ok(applied)
}

/// Set who may run privileged commands in a group.
pub async fn set_group_power_mode(
    pool: &SqlitePool,
    group_id: &str,
    mode: PowerMode,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO group_settings (group_id, power_mode)
        VALUES (?, ?)
        ON CONFLICT(group_id) DO UPDATE SET
            power_mode = excluded.power_mode,
            updated_at = datetime('now')
        "#,
    )
    .bind(group_id)
    .bind(mode.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Toggle whether a completed summary purges the messages it consumed.
pub async fn set_purge_on_summary(
    pool: &SqlitePool,
    group_id: &str,
    purge: bool,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO group_settings (group_id, purge_on_summary)
        VALUES (?, ?)
        ON CONFLICT(group_id) DO UPDATE SET
            purge_on_summary = excluded.purge_on_summary,
            updated_at = datetime('now')
        "#,
    )
    .bind(group_id)
    .bind(purge)
    .execute(pool)
    .await?;
    Ok(())
}

/// Whether summaries purge consumed messages for this group. Defaults to
/// true when no settings row exists.
pub async fn purge_on_summary(pool: &SqlitePool, group_id: &str) -> Result<bool, DatabaseError> {
    Ok(get_group_settings(pool, group_id)
        .await?
        .map(|s| s.purge_on_summary)
        .unwrap_or(true))
}

/// All explicit group retention values, for the purge pass.
pub async fn all_group_retention(pool: &SqlitePool) -> Result<Vec<(String, i64)>, DatabaseError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT group_id, retention_hours FROM group_settings",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch DM settings for a user, if any exist.
pub async fn get_dm_settings(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<DmSettings>, DatabaseError> {
    let settings = sqlx::query_as::<_, DmSettings>(
        "SELECT user_id, retention_hours, updated_at FROM dm_settings WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(settings)
}

/// Set a user's DM retention window.
pub async fn set_dm_retention(
    pool: &SqlitePool,
    user_id: &str,
    hours: i64,
) -> Result<(), DatabaseError> {
    validate_retention_hours(hours)?;

    sqlx::query(
        r#"
        INSERT INTO dm_settings (user_id, retention_hours)
        VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            retention_hours = excluded.retention_hours,
            updated_at = datetime('now')
        "#,
    )
    .bind(user_id)
    .bind(hours)
    .execute(pool)
    .await?;
    Ok(())
}

/// All explicit DM retention values, for the purge pass.
pub async fn all_dm_retention(pool: &SqlitePool) -> Result<Vec<(String, i64)>, DatabaseError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT user_id, retention_hours FROM dm_settings",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
