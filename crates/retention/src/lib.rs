//! Cascading retention purge engine.
//!
//! Each group's retention window resolves through an ordered cascade:
//! explicit per-group settings first, then the retention of the first
//! enabled schedule sourcing the group, then the global default. The first
//! tier that produces a value wins. DM retention is simpler: per-user
//! setting or the default. Purging is idempotent; a second pass right
//! after the first deletes nothing.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use database::{dm, message, schedule, settings, summary_run, Database, DatabaseError};

/// Errors from a purge pass.
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Defaults applied when no explicit setting exists.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Fallback group message retention.
    pub default_message_hours: i64,
    /// Fallback DM retention.
    pub default_dm_hours: i64,
    /// How long finished summary runs are kept.
    pub run_retention_hours: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            default_message_hours: 48,
            default_dm_hours: 48,
            run_retention_hours: 168,
        }
    }
}

/// Which cascade tier supplied a retention value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionTier {
    /// Explicit group settings row.
    GroupSettings,
    /// Retention of an enabled schedule sourcing the group.
    Schedule,
    /// Global default.
    Default,
}

/// Resolve one group's retention window. `schedule_hours` is the retention
/// of the first enabled schedule sourcing the group, if any.
pub fn resolve_group_retention(
    explicit_hours: Option<i64>,
    schedule_hours: Option<i64>,
    default_hours: i64,
) -> (i64, RetentionTier) {
    if let Some(hours) = explicit_hours {
        return (hours, RetentionTier::GroupSettings);
    }
    if let Some(hours) = schedule_hours {
        return (hours, RetentionTier::Schedule);
    }
    (default_hours, RetentionTier::Default)
}

/// Counters for one purge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub messages_deleted: u64,
    pub dm_turns_deleted: u64,
    pub runs_deleted: u64,
    /// Per-group deletion counts, only groups where something was deleted.
    pub groups: Vec<(String, u64)>,
}

impl PurgeReport {
    pub fn total(&self) -> u64 {
        self.messages_deleted + self.dm_turns_deleted + self.runs_deleted
    }
}

/// Applies retention across messages, DM history, and summary runs.
pub struct RetentionEngine {
    db: Database,
    config: RetentionConfig,
}

impl RetentionEngine {
    pub fn new(db: Database, config: RetentionConfig) -> Self {
        Self { db, config }
    }

    /// Purge expired group messages. Reactions cascade with their messages.
    pub async fn purge_group_messages(&self) -> Result<PurgeReport, RetentionError> {
        let pool = self.db.pool();
        let mut report = PurgeReport::default();

        // First enabled schedule per source group wins the middle tier.
        let mut schedule_hours: HashMap<String, i64> = HashMap::new();
        for sched in schedule::list_enabled(pool).await? {
            schedule_hours
                .entry(sched.source_group_id)
                .or_insert(sched.retention_hours);
        }

        for group_id in message::group_ids_with_messages(pool).await? {
            let explicit = settings::get_group_settings(pool, &group_id)
                .await?
                .map(|s| s.retention_hours);
            let (hours, tier) = resolve_group_retention(
                explicit,
                schedule_hours.get(&group_id).copied(),
                self.config.default_message_hours,
            );

            let deleted = message::purge_for_group(pool, &group_id, hours).await?;
            if deleted > 0 {
                debug!(group_id, hours, ?tier, deleted, "Group purge");
                report.messages_deleted += deleted;
                report.groups.push((group_id, deleted));
            }
        }
        Ok(report)
    }

    /// Purge expired DM conversation turns, per user.
    pub async fn purge_dm_history(&self) -> Result<u64, RetentionError> {
        let pool = self.db.pool();
        let explicit: HashMap<String, i64> =
            settings::all_dm_retention(pool).await?.into_iter().collect();

        let mut deleted = 0;
        for user_id in dm::user_ids(pool).await? {
            let hours = explicit
                .get(&user_id)
                .copied()
                .unwrap_or(self.config.default_dm_hours);
            deleted += dm::purge_for_user(pool, &user_id, hours).await?;
        }
        Ok(deleted)
    }

    /// Purge finished summary runs past the run retention window. Pending
    /// runs are never deleted.
    pub async fn purge_summary_runs(&self) -> Result<u64, RetentionError> {
        Ok(summary_run::purge_stale(self.db.pool(), self.config.run_retention_hours).await?)
    }

    /// One full purge pass over everything retention governs.
    pub async fn purge_all(&self) -> Result<PurgeReport, RetentionError> {
        let mut report = self.purge_group_messages().await?;
        report.dm_turns_deleted = self.purge_dm_history().await?;
        report.runs_deleted = self.purge_summary_runs().await?;

        if report.total() > 0 {
            info!(
                messages = report.messages_deleted,
                dm_turns = report.dm_turns_deleted,
                runs = report.runs_deleted,
                "Retention purge pass"
            );
        }
        Ok(report)
    }
}
