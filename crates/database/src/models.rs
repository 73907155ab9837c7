//! Row models and enumerations shared across entity modules.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::DatabaseError;

/// Where a group's retention value came from.
///
/// `Signal` values track the group's disappearing-message timer and may be
/// rewritten by ingestion; `Command` values were set by a human and stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionSource {
    Signal,
    Command,
}

impl RetentionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Command => "command",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DatabaseError> {
        match s {
            "signal" => Ok(Self::Signal),
            "command" => Ok(Self::Command),
            _ => Err(DatabaseError::Malformed {
                entity: "group_settings",
                column: "source",
            }),
        }
    }
}

/// Who may run privileged commands in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    Admins,
    Everyone,
}

impl PowerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::Everyone => "everyone",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DatabaseError> {
        match s {
            "admins" => Ok(Self::Admins),
            "everyone" => Ok(Self::Everyone),
            _ => Err(DatabaseError::Malformed {
                entity: "group_settings",
                column: "power_mode",
            }),
        }
    }
}

/// Cadence of a scheduled summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Daily,
    Weekly,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DatabaseError> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            _ => Err(DatabaseError::Malformed {
                entity: "scheduled_summaries",
                column: "schedule_type",
            }),
        }
    }
}

/// Lifecycle state of a summary run. Terminal states are set exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DatabaseError> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(DatabaseError::Malformed {
                entity: "summary_runs",
                column: "status",
            }),
        }
    }
}

/// A chat group known to the system.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub group_id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored group message.
///
/// `origin_timestamp` is the sender-assigned epoch-millisecond timestamp;
/// `stored_at` is when this process persisted the row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub origin_timestamp: i64,
    pub sender_id: String,
    pub group_id: String,
    pub content: Option<String>,
    pub stored_at: String,
}

/// An emoji reaction attached to a stored message.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub message_id: i64,
    pub emoji: String,
    pub reactor_id: String,
    pub timestamp: i64,
}

/// Per-group retention and permission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSettings {
    pub group_id: String,
    pub retention_hours: i64,
    pub source: RetentionSource,
    pub power_mode: PowerMode,
    pub purge_on_summary: bool,
    pub updated_at: String,
}

/// Per-user direct-message retention settings.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DmSettings {
    pub user_id: String,
    pub retention_hours: i64,
    pub updated_at: String,
}

/// One turn of a direct-message conversation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DmMessage {
    pub id: i64,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub origin_timestamp: Option<i64>,
    pub created_at: String,
}

/// A configured recurring summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSummary {
    pub id: i64,
    pub name: String,
    pub source_group_id: String,
    pub target_group_id: String,
    /// Local wall-clock firing times, each "HH:MM".
    pub schedule_times: Vec<String>,
    /// IANA timezone name the times are interpreted in.
    pub timezone: String,
    /// How far back each summary window reaches.
    pub summary_period_hours: i64,
    pub schedule_type: ScheduleType,
    /// Weekly only: 0 = Monday .. 6 = Sunday.
    pub schedule_day_of_week: Option<i64>,
    pub retention_hours: i64,
    pub detail_mode: bool,
    pub enabled: bool,
    pub last_run: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to create a [`ScheduledSummary`].
#[derive(Debug, Clone)]
pub struct NewScheduledSummary {
    pub name: String,
    pub source_group_id: String,
    pub target_group_id: String,
    pub schedule_times: Vec<String>,
    pub timezone: String,
    pub summary_period_hours: i64,
    pub schedule_type: ScheduleType,
    pub schedule_day_of_week: Option<i64>,
    pub retention_hours: i64,
    pub detail_mode: bool,
    pub enabled: bool,
}

impl Default for NewScheduledSummary {
    fn default() -> Self {
        Self {
            name: String::new(),
            source_group_id: String::new(),
            target_group_id: String::new(),
            schedule_times: Vec::new(),
            timezone: "UTC".to_string(),
            summary_period_hours: 24,
            schedule_type: ScheduleType::Daily,
            schedule_day_of_week: None,
            retention_hours: 48,
            detail_mode: true,
            enabled: true,
        }
    }
}

/// Execution record of one summary attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRun {
    pub id: i64,
    pub schedule_id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub message_count: i64,
    pub oldest_message_time: Option<String>,
    pub newest_message_time: Option<String>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    /// Retained only so a recent summary can be resent.
    pub summary_text: Option<String>,
}

/// A message joined with its reaction totals, as fed to the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageWithReactions {
    pub content: String,
    pub sender_id: String,
    pub origin_timestamp: i64,
    pub reaction_count: i64,
    pub emojis: Vec<String>,
}
