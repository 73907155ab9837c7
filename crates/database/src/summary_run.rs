//! Summary run tracking: pending, completed, failed.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row, SqlitePool};
use tracing::debug;

use crate::error::DatabaseError;
use crate::format_utc;
use crate::models::{RunStatus, SummaryRun};

#[derive(FromRow)]
struct RunRow {
    id: i64,
    schedule_id: i64,
    started_at: String,
    completed_at: Option<String>,
    message_count: i64,
    oldest_message_time: Option<String>,
    newest_message_time: Option<String>,
    status: String,
    error_message: Option<String>,
    summary_text: Option<String>,
}

impl TryFrom<RunRow> for SummaryRun {
    type Error = DatabaseError;

    fn try_from(row: RunRow) -> Result<Self, DatabaseError> {
        Ok(SummaryRun {
            id: row.id,
            schedule_id: row.schedule_id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            message_count: row.message_count,
            oldest_message_time: row.oldest_message_time,
            newest_message_time: row.newest_message_time,
            status: RunStatus::parse(&row.status)?,
            error_message: row.error_message,
            summary_text: row.summary_text,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id, schedule_id, started_at, completed_at, message_count,
    oldest_message_time, newest_message_time, status, error_message, summary_text
"#;

/// Open a pending run for a schedule, returning its id.
pub async fn create(pool: &SqlitePool, schedule_id: i64) -> Result<i64, DatabaseError> {
    let result = sqlx::query("INSERT INTO summary_runs (schedule_id) VALUES (?)")
        .bind(schedule_id)
        .execute(pool)
        .await?;
    let id = result.last_insert_rowid();
    debug!(run_id = id, schedule_id, "Opened summary run");
    Ok(id)
}

/// Fetch a run by id.
pub async fn get(pool: &SqlitePool, run_id: i64) -> Result<SummaryRun, DatabaseError> {
    let row = sqlx::query_as::<_, RunRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM summary_runs WHERE id = ?"
    ))
    .bind(run_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("SummaryRun", run_id))?;
    row.try_into()
}

/// Mark a pending run completed. The transition happens at most once; a run
/// that is no longer pending is reported as not found.
pub async fn complete(
    pool: &SqlitePool,
    run_id: i64,
    message_count: i64,
    oldest: Option<DateTime<Utc>>,
    newest: Option<DateTime<Utc>>,
    summary_text: &str,
) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE summary_runs
        SET status = 'completed',
            completed_at = datetime('now'),
            message_count = ?,
            oldest_message_time = ?,
            newest_message_time = ?,
            summary_text = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(message_count)
    .bind(oldest.map(format_utc))
    .bind(newest.map(format_utc))
    .bind(summary_text)
    .bind(run_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("SummaryRun", run_id));
    }
    Ok(())
}

/// Mark a pending run failed with a diagnostic message.
pub async fn fail(pool: &SqlitePool, run_id: i64, error: &str) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE summary_runs
        SET status = 'failed', completed_at = datetime('now'), error_message = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(error)
    .bind(run_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("SummaryRun", run_id));
    }
    Ok(())
}

/// Most recent runs across all schedules.
pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<SummaryRun>, DatabaseError> {
    let rows = sqlx::query_as::<_, RunRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM summary_runs ORDER BY started_at DESC, id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Most recent runs for one schedule.
pub async fn for_schedule(
    pool: &SqlitePool,
    schedule_id: i64,
    limit: i64,
) -> Result<Vec<SummaryRun>, DatabaseError> {
    let rows = sqlx::query_as::<_, RunRow>(&format!(
        r#"
        SELECT {SELECT_COLUMNS} FROM summary_runs
        WHERE schedule_id = ? ORDER BY started_at DESC, id DESC LIMIT ?
        "#
    ))
    .bind(schedule_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(TryInto::try_into).collect()
}

/// The most recent completed run for a schedule, for resend.
pub async fn latest_completed(
    pool: &SqlitePool,
    schedule_id: i64,
) -> Result<Option<SummaryRun>, DatabaseError> {
    let row = sqlx::query_as::<_, RunRow>(&format!(
        r#"
        SELECT {SELECT_COLUMNS} FROM summary_runs
        WHERE schedule_id = ? AND status = 'completed'
        ORDER BY completed_at DESC, id DESC LIMIT 1
        "#
    ))
    .bind(schedule_id)
    .fetch_optional(pool)
    .await?;
    row.map(TryInto::try_into).transpose()
}

/// Delete finished runs older than `older_than_hours`. Pending runs are
/// never touched regardless of age.
pub async fn purge_stale(pool: &SqlitePool, older_than_hours: i64) -> Result<u64, DatabaseError> {
    let modifier = format!("-{} hours", older_than_hours);
    let result = sqlx::query(
        r#"
        DELETE FROM summary_runs
        WHERE status != 'pending' AND completed_at < datetime('now', ?)
        "#,
    )
    .bind(&modifier)
    .execute(pool)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        debug!(deleted, "Purged stale summary runs");
    }
    Ok(deleted)
}

/// Count runs per status, for diagnostics.
pub async fn status_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>, DatabaseError> {
    let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM summary_runs GROUP BY status")
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|row| Ok((row.try_get("status")?, row.try_get("n")?)))
        .collect()
}
