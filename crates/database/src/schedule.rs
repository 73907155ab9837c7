//! Scheduled summary configuration.

use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::error::DatabaseError;
use crate::models::{NewScheduledSummary, ScheduleType, ScheduledSummary};
use crate::validation::{
    parse_schedule_time, validate_day_of_week, validate_period_hours, validate_retention_hours,
    ValidationError,
};

/// Raw row shape; `schedule_times` is stored as a JSON array of "HH:MM"
/// strings and `schedule_type` as its lowercase name.
#[derive(FromRow)]
struct ScheduleRow {
    id: i64,
    name: String,
    source_group_id: String,
    target_group_id: String,
    schedule_times: String,
    timezone: String,
    summary_period_hours: i64,
    schedule_type: String,
    schedule_day_of_week: Option<i64>,
    retention_hours: i64,
    detail_mode: bool,
    enabled: bool,
    last_run: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ScheduleRow> for ScheduledSummary {
    type Error = DatabaseError;

    fn try_from(row: ScheduleRow) -> Result<Self, DatabaseError> {
        let schedule_times: Vec<String> =
            serde_json::from_str(&row.schedule_times).map_err(|_| DatabaseError::Malformed {
                entity: "scheduled_summaries",
                column: "schedule_times",
            })?;
        Ok(ScheduledSummary {
            id: row.id,
            name: row.name,
            source_group_id: row.source_group_id,
            target_group_id: row.target_group_id,
            schedule_times,
            timezone: row.timezone,
            summary_period_hours: row.summary_period_hours,
            schedule_type: ScheduleType::parse(&row.schedule_type)?,
            schedule_day_of_week: row.schedule_day_of_week,
            retention_hours: row.retention_hours,
            detail_mode: row.detail_mode,
            enabled: row.enabled,
            last_run: row.last_run,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id, name, source_group_id, target_group_id, schedule_times, timezone,
    summary_period_hours, schedule_type, schedule_day_of_week, retention_hours,
    detail_mode, enabled, last_run, created_at, updated_at
"#;

fn validate(new: &NewScheduledSummary) -> Result<(), DatabaseError> {
    if new.name.trim().is_empty() {
        return Err(ValidationError::Empty("name").into());
    }
    if new.schedule_times.is_empty() {
        return Err(ValidationError::Empty("schedule_times").into());
    }
    for time in &new.schedule_times {
        parse_schedule_time(time)?;
    }
    validate_period_hours(new.summary_period_hours)?;
    validate_retention_hours(new.retention_hours)?;
    match (new.schedule_type, new.schedule_day_of_week) {
        (ScheduleType::Weekly, None) => return Err(ValidationError::MissingDayOfWeek.into()),
        (_, Some(day)) => validate_day_of_week(day)?,
        (ScheduleType::Daily, None) => {}
    }
    Ok(())
}

/// Create a schedule. The name must be unique.
pub async fn create(
    pool: &SqlitePool,
    new: &NewScheduledSummary,
) -> Result<ScheduledSummary, DatabaseError> {
    validate(new)?;

    let times_json = serde_json::to_string(&new.schedule_times).map_err(|_| {
        DatabaseError::Malformed {
            entity: "scheduled_summaries",
            column: "schedule_times",
        }
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO scheduled_summaries
            (name, source_group_id, target_group_id, schedule_times, timezone,
             summary_period_hours, schedule_type, schedule_day_of_week,
             retention_hours, detail_mode, enabled)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.name)
    .bind(&new.source_group_id)
    .bind(&new.target_group_id)
    .bind(&times_json)
    .bind(&new.timezone)
    .bind(new.summary_period_hours)
    .bind(new.schedule_type.as_str())
    .bind(new.schedule_day_of_week)
    .bind(new.retention_hours)
    .bind(new.detail_mode)
    .bind(new.enabled)
    .execute(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::AlreadyExists {
            entity: "ScheduledSummary",
            id: new.name.clone(),
        },
        _ => DatabaseError::Sqlx(e),
    })?;

    info!(name = %new.name, "Created scheduled summary");
    get(pool, result.last_insert_rowid()).await
}

/// Fetch a schedule by id.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<ScheduledSummary, DatabaseError> {
    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM scheduled_summaries WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("ScheduledSummary", id))?;
    row.try_into()
}

/// Fetch a schedule by name, if present.
pub async fn get_by_name(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<ScheduledSummary>, DatabaseError> {
    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM scheduled_summaries WHERE name = ?"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;
    row.map(TryInto::try_into).transpose()
}

/// All schedules, creation order.
pub async fn list(pool: &SqlitePool) -> Result<Vec<ScheduledSummary>, DatabaseError> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM scheduled_summaries ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Enabled schedules only, creation order.
pub async fn list_enabled(pool: &SqlitePool) -> Result<Vec<ScheduledSummary>, DatabaseError> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM scheduled_summaries WHERE enabled = 1 ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Enable or disable a schedule.
pub async fn set_enabled(pool: &SqlitePool, id: i64, enabled: bool) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        "UPDATE scheduled_summaries SET enabled = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(enabled)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ScheduledSummary", id));
    }
    Ok(())
}

/// Change a schedule's retention window.
pub async fn set_retention_hours(
    pool: &SqlitePool,
    id: i64,
    hours: i64,
) -> Result<(), DatabaseError> {
    validate_retention_hours(hours)?;
    let result = sqlx::query(
        r#"
        UPDATE scheduled_summaries
        SET retention_hours = ?, updated_at = datetime('now') WHERE id = ?
        "#,
    )
    .bind(hours)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ScheduledSummary", id));
    }
    Ok(())
}

/// Replace a schedule's firing times and timezone.
pub async fn set_schedule_times(
    pool: &SqlitePool,
    id: i64,
    times: &[String],
    timezone: &str,
) -> Result<(), DatabaseError> {
    if times.is_empty() {
        return Err(ValidationError::Empty("schedule_times").into());
    }
    for time in times {
        parse_schedule_time(time)?;
    }
    let times_json = serde_json::to_string(times).map_err(|_| DatabaseError::Malformed {
        entity: "scheduled_summaries",
        column: "schedule_times",
    })?;

    let result = sqlx::query(
        r#"
        UPDATE scheduled_summaries
        SET schedule_times = ?, timezone = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(&times_json)
    .bind(timezone)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ScheduledSummary", id));
    }
    Ok(())
}

/// Record the moment a schedule last produced a summary.
pub async fn set_last_run(pool: &SqlitePool, id: i64) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE scheduled_summaries
        SET last_run = datetime('now'), updated_at = datetime('now') WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ScheduledSummary", id));
    }
    Ok(())
}

/// Delete a schedule. Its runs cascade.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM scheduled_summaries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ScheduledSummary", id));
    }
    info!(id, "Deleted scheduled summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{group, test_db};

    async fn seed_groups(pool: &SqlitePool) {
        group::upsert_group(pool, "src", "Source", "").await.unwrap();
        group::upsert_group(pool, "dst", "Target", "").await.unwrap();
    }

    fn sample(name: &str) -> NewScheduledSummary {
        NewScheduledSummary {
            name: name.to_string(),
            source_group_id: "src".to_string(),
            target_group_id: "dst".to_string(),
            schedule_times: vec!["09:00".to_string(), "17:30".to_string()],
            timezone: "America/New_York".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_round_trips_times_json() {
        let db = test_db().await;
        seed_groups(db.pool()).await;

        let created = create(db.pool(), &sample("daily")).await.unwrap();
        assert_eq!(created.schedule_times, vec!["09:00", "17:30"]);
        assert_eq!(created.schedule_type, ScheduleType::Daily);
        assert!(created.enabled);
        assert!(created.last_run.is_none());

        let fetched = get(db.pool(), created.id).await.unwrap();
        assert_eq!(fetched.schedule_times, created.schedule_times);
        assert_eq!(fetched.timezone, "America/New_York");
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let db = test_db().await;
        seed_groups(db.pool()).await;

        create(db.pool(), &sample("daily")).await.unwrap();
        let err = create(db.pool(), &sample("daily")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn weekly_requires_day_of_week() {
        let db = test_db().await;
        seed_groups(db.pool()).await;

        let mut weekly = sample("weekly");
        weekly.schedule_type = ScheduleType::Weekly;
        let err = create(db.pool(), &weekly).await.unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Validation(ValidationError::MissingDayOfWeek)
        ));

        weekly.schedule_day_of_week = Some(0);
        let created = create(db.pool(), &weekly).await.unwrap();
        assert_eq!(created.schedule_day_of_week, Some(0));
    }

    #[tokio::test]
    async fn invalid_time_rejected() {
        let db = test_db().await;
        seed_groups(db.pool()).await;

        let mut bad = sample("bad");
        bad.schedule_times = vec!["25:00".to_string()];
        assert!(matches!(
            create(db.pool(), &bad).await.unwrap_err(),
            DatabaseError::Validation(ValidationError::InvalidTime(_))
        ));
    }

    #[tokio::test]
    async fn enabled_filter_and_updates() {
        let db = test_db().await;
        seed_groups(db.pool()).await;

        let a = create(db.pool(), &sample("a")).await.unwrap();
        let b = create(db.pool(), &sample("b")).await.unwrap();

        set_enabled(db.pool(), b.id, false).await.unwrap();
        let enabled = list_enabled(db.pool()).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, a.id);

        set_retention_hours(db.pool(), a.id, 120).await.unwrap();
        set_schedule_times(db.pool(), a.id, &["06:15".to_string()], "UTC")
            .await
            .unwrap();
        set_last_run(db.pool(), a.id).await.unwrap();

        let a = get(db.pool(), a.id).await.unwrap();
        assert_eq!(a.retention_hours, 120);
        assert_eq!(a.schedule_times, vec!["06:15"]);
        assert!(a.last_run.is_some());

        delete(db.pool(), b.id).await.unwrap();
        assert!(matches!(
            get(db.pool(), b.id).await.unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
        assert!(matches!(
            set_enabled(db.pool(), 999, true).await.unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }
}
