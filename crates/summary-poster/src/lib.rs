//! Summary generation and delivery.
//!
//! [`SummaryPoster`] turns one schedule firing into a tracked summary run:
//! it reads the message window, asks the summarizer for text, posts the
//! result to the target group, and settles the run record as completed or
//! failed. A dry run walks the same path but sends nothing and leaves no
//! side effects beyond the run record.

pub mod format;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use database::{
    group, message, schedule, settings, summary_run, Database, DatabaseError, ScheduledSummary,
};
use signal_daemon::{DaemonError, SignalTransport};
use summarizer::{MessageRecord, Summarizer, SummarizerError, SummaryInput};

use format::{
    format_low_activity, format_no_activity, format_summary_message, split_long_message,
    MAX_MESSAGE_LEN,
};

/// Errors from the posting pipeline.
#[derive(Debug, Error)]
pub enum PosterError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error(transparent)]
    Summarizer(#[from] SummarizerError),

    /// Resend was requested but no completed run holds a summary.
    #[error("no completed summary to resend for schedule {schedule_id}")]
    NoCompletedRun { schedule_id: i64 },

    /// The named run exists but carries no summary text (it failed, or
    /// its text was already purged).
    #[error("run {run_id} has no stored summary text")]
    NoStoredSummary { run_id: i64 },
}

/// Executes summary runs for schedules.
pub struct SummaryPoster<T: SignalTransport, S: Summarizer> {
    transport: Arc<T>,
    summarizer: Arc<S>,
    db: Database,
}

impl<T: SignalTransport, S: Summarizer> SummaryPoster<T, S> {
    pub fn new(transport: Arc<T>, summarizer: Arc<S>, db: Database) -> Self {
        Self {
            transport,
            summarizer,
            db,
        }
    }

    /// Execute one summary run for a schedule. Returns the run id; the run
    /// record ends completed or failed, never pending.
    pub async fn execute(&self, schedule_id: i64, dry_run: bool) -> Result<i64, PosterError> {
        let sched = schedule::get(self.db.pool(), schedule_id).await?;
        let run_id = summary_run::create(self.db.pool(), schedule_id).await?;

        match self.execute_run(&sched, run_id, dry_run).await {
            Ok(()) => Ok(run_id),
            Err(e) => {
                if let Err(mark) = summary_run::fail(self.db.pool(), run_id, &e.to_string()).await {
                    warn!(run_id, "Could not mark run failed: {mark}");
                }
                Err(e)
            }
        }
    }

    async fn execute_run(
        &self,
        sched: &ScheduledSummary,
        run_id: i64,
        dry_run: bool,
    ) -> Result<(), PosterError> {
        let pool = self.db.pool();
        let until = Utc::now();
        let since = until - Duration::hours(sched.summary_period_hours);

        let records = message::messages_with_reactions(
            pool,
            &sched.source_group_id,
            Some(since.timestamp_millis()),
            Some(until.timestamp_millis()),
        )
        .await?;

        let group_name = group::find_group(pool, &sched.source_group_id)
            .await?
            .map(|g| g.name)
            .unwrap_or_else(|| sched.source_group_id.clone());

        let count = records.len();
        let oldest = records
            .first()
            .and_then(|r| DateTime::from_timestamp_millis(r.origin_timestamp));
        let newest = records
            .last()
            .and_then(|r| DateTime::from_timestamp_millis(r.origin_timestamp));

        let input = SummaryInput {
            group_name: group_name.clone(),
            period_hours: sched.summary_period_hours,
            detail: sched.detail_mode,
            messages: records
                .into_iter()
                .map(|r| MessageRecord {
                    sender: r.sender_id,
                    content: r.content,
                    reaction_count: r.reaction_count,
                    emojis: r.emojis,
                })
                .collect(),
        };

        let text = if count == 0 {
            format_no_activity(&group_name, sched.summary_period_hours)
        } else if !input.has_enough_content() {
            format_low_activity(&group_name, sched.summary_period_hours, count)
        } else {
            let summary = self.summarizer.summarize(&input).await?;
            format_summary_message(&group_name, sched.summary_period_hours, count, &summary)
        };

        if dry_run {
            info!(
                schedule = %sched.name,
                run_id,
                messages = count,
                "Dry run, not posting:\n{text}"
            );
        } else {
            self.post(&sched.target_group_id, &text).await?;
            schedule::set_last_run(pool, sched.id).await?;

            if count > 0 && settings::purge_on_summary(pool, &sched.source_group_id).await? {
                let purged =
                    message::purge_for_group_through(pool, &sched.source_group_id, until).await?;
                debug!(schedule = %sched.name, purged, "Purged summarized window");
            }
        }

        summary_run::complete(pool, run_id, count as i64, oldest, newest, &text).await?;
        info!(schedule = %sched.name, run_id, messages = count, dry_run, "Summary run completed");
        Ok(())
    }

    /// Post the most recent completed summary for a schedule again,
    /// without opening a new run or touching stored messages.
    pub async fn resend(&self, schedule_id: i64, dry_run: bool) -> Result<i64, PosterError> {
        let run = summary_run::latest_completed(self.db.pool(), schedule_id)
            .await?
            .ok_or(PosterError::NoCompletedRun { schedule_id })?;
        self.resend_run(run.id, dry_run).await
    }

    /// Post a specific run's stored summary text again, verbatim.
    pub async fn resend_run(&self, run_id: i64, dry_run: bool) -> Result<i64, PosterError> {
        let pool = self.db.pool();
        let run = summary_run::get(pool, run_id).await?;
        let sched = schedule::get(pool, run.schedule_id).await?;

        let text = run
            .summary_text
            .filter(|t| !t.is_empty())
            .ok_or(PosterError::NoStoredSummary { run_id })?;

        if dry_run {
            info!(schedule = %sched.name, run_id, "Dry run, not resending:\n{text}");
        } else {
            self.post(&sched.target_group_id, &text).await?;
            info!(schedule = %sched.name, run_id, "Resent summary");
        }
        Ok(run_id)
    }

    async fn post(&self, target_group_id: &str, text: &str) -> Result<(), PosterError> {
        for (i, part) in split_long_message(text, MAX_MESSAGE_LEN).iter().enumerate() {
            if i > 0 {
                // Keep numbered parts arriving in order.
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
            self.transport.send_to_group(target_group_id, part).await?;
        }
        Ok(())
    }
}
