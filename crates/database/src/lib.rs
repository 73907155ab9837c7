//! SQLite persistence layer for Recap.
//!
//! Storage here is deliberately transient: group messages live only until a
//! summary consumes them or their retention window lapses. The modules are
//! split per entity; all of them operate on a shared [`sqlx::SqlitePool`].

pub mod dm;
pub mod error;
pub mod group;
pub mod message;
pub mod models;
pub mod reaction;
pub mod schedule;
pub mod settings;
pub mod summary_run;
pub mod validation;

pub use error::DatabaseError;
pub use models::{
    DmMessage, DmSettings, Group, GroupSettings, Message, MessageWithReactions,
    NewScheduledSummary, PowerMode, Reaction, RetentionSource, RunStatus, ScheduleType,
    ScheduledSummary, SummaryRun,
};
pub use validation::{ValidationError, MAX_RETENTION_HOURS, MIN_RETENTION_HOURS};

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Format used for every TEXT timestamp column, matching SQLite's
/// `datetime('now')` output so values compare lexicographically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a UTC instant in the stored column format.
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored column timestamp back into a UTC instant.
pub fn parse_utc(text: &str) -> Result<DateTime<Utc>, DatabaseError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| DatabaseError::Malformed {
            entity: "timestamp",
            column: "value",
        })
}

/// Handle to the Recap database.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `database_url` and run
    /// pending migrations. Foreign keys are enforced so reaction rows
    /// cascade with their messages.
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(DatabaseError::Sqlx)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(DatabaseError::Sqlx)?;

        let db = Self { pool };
        db.migrate().await?;
        info!("Database ready at {}", database_url);
        Ok(db)
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> Database {
    Database::connect("sqlite::memory:")
        .await
        .expect("in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_apply_cleanly() {
        let db = test_db().await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        db.close().await;
    }

    #[test]
    fn timestamp_round_trip() {
        let now = Utc::now();
        let text = format_utc(now);
        let parsed = parse_utc(&text).unwrap();
        assert_eq!(parsed.timestamp(), now.timestamp());
    }
}
