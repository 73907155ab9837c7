//! Timezone-aware summary scheduler.
//!
//! The scheduler turns enabled schedules into cron triggers, sleeps until
//! each trigger's next firing, and hands the firing to a
//! [`SummaryDispatcher`]. Triggers are generation-tagged: a reload or stop
//! bumps the generation, which cancels every waiting trigger task without
//! interrupting a dispatch already in flight. It also owns the periodic
//! retention purge, including one pass at startup so a process that was
//! down past its purge interval catches up immediately.

mod trigger;

pub use trigger::{build_triggers, parse_timezone, Trigger};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use database::{schedule, Database, DatabaseError, ValidationError};
use retention::{RetentionEngine, RetentionError};
use signal_daemon::SignalTransport;
use summarizer::Summarizer;
use summary_poster::{PosterError, SummaryPoster};

/// Errors from scheduler control operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Retention(#[from] RetentionError),

    /// A stored schedule cannot be turned into a trigger.
    #[error("schedule {schedule_id} is not schedulable: {reason}")]
    InvalidSchedule { schedule_id: i64, reason: String },
}

/// Receives trigger firings. [`SummaryPoster`] is the production
/// implementation; tests substitute counters.
#[async_trait]
pub trait SummaryDispatcher: Send + Sync + 'static {
    /// Execute one summary run for the schedule, returning the run id.
    async fn dispatch(&self, schedule_id: i64) -> Result<i64, PosterError>;
}

#[async_trait]
impl<T, S> SummaryDispatcher for SummaryPoster<T, S>
where
    T: SignalTransport + 'static,
    S: Summarizer + 'static,
{
    async fn dispatch(&self, schedule_id: i64) -> Result<i64, PosterError> {
        self.execute(schedule_id, false).await
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between retention purge passes.
    pub purge_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            purge_interval: Duration::from_secs(3600),
        }
    }
}

/// Owns the trigger tasks and the purge loop.
pub struct Scheduler<D: SummaryDispatcher> {
    db: Database,
    dispatcher: Arc<D>,
    retention: Arc<RetentionEngine>,
    config: SchedulerConfig,
    generation: watch::Sender<u64>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    purge_task: Mutex<Option<JoinHandle<()>>>,
}

impl<D: SummaryDispatcher> Scheduler<D> {
    pub fn new(
        db: Database,
        dispatcher: Arc<D>,
        retention: Arc<RetentionEngine>,
        config: SchedulerConfig,
    ) -> Self {
        let (generation, _) = watch::channel(0u64);
        let (shutdown, _) = watch::channel(false);
        Self {
            db,
            dispatcher,
            retention,
            config,
            generation,
            shutdown,
            tasks: Mutex::new(Vec::new()),
            purge_task: Mutex::new(None),
        }
    }

    /// Run the startup purge, spawn the fixed-interval purge loop, and
    /// register triggers for every enabled schedule. Returns the number of
    /// triggers registered.
    pub async fn start(&self) -> Result<usize, SchedulerError> {
        let report = self.retention.purge_all().await?;
        if report.total() > 0 {
            info!(deleted = report.total(), "Startup retention purge");
        }
        *self.purge_task.lock().await = Some(self.spawn_purge_loop());
        self.reload().await
    }

    /// Rebuild triggers from the database. Waiting trigger tasks from the
    /// previous generation are cancelled; a dispatch already executing
    /// finishes normally. The purge loop is not touched.
    pub async fn reload(&self) -> Result<usize, SchedulerError> {
        let schedules = schedule::list_enabled(self.db.pool()).await?;

        self.generation.send_modify(|g| *g += 1);
        let generation = *self.generation.borrow();

        let mut handles = Vec::new();
        for sched in &schedules {
            for trig in build_triggers(sched)? {
                handles.push(self.spawn_trigger(trig, generation));
            }
        }
        let count = handles.len();

        *self.tasks.lock().await = handles;
        info!(schedules = schedules.len(), triggers = count, "Scheduler (re)loaded");
        Ok(count)
    }

    /// Cancel the trigger tasks and the purge loop, waiting for them to
    /// finish.
    pub async fn stop(&self) {
        self.generation.send_modify(|g| *g += 1);
        let _ = self.shutdown.send(true);

        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        if let Some(handle) = self.purge_task.lock().await.take() {
            let _ = handle.await;
        }
        info!("Scheduler stopped");
    }

    /// Number of live trigger tasks.
    pub async fn trigger_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    fn spawn_trigger(&self, trig: Trigger, generation: u64) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let mut rx = self.generation.subscribe();

        tokio::spawn(async move {
            loop {
                if *rx.borrow() != generation {
                    break;
                }
                let now = Utc::now();
                let Some(next) = trig.next_fire(now) else {
                    warn!(schedule = %trig.schedule_name, "No future firing, trigger retired");
                    break;
                };
                let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
                debug!(schedule = %trig.schedule_name, %next, "Trigger armed");

                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() != generation {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(delay) => {
                        match dispatcher.dispatch(trig.schedule_id).await {
                            Ok(run_id) => {
                                info!(schedule = %trig.schedule_name, run_id, "Trigger fired")
                            }
                            Err(e) => {
                                // The run record carries the failure; the
                                // trigger keeps its future firings.
                                warn!(schedule = %trig.schedule_name, "Dispatch failed: {e}")
                            }
                        }
                    }
                }
            }
        })
    }

    fn spawn_purge_loop(&self) -> JoinHandle<()> {
        let retention = Arc::clone(&self.retention);
        let interval = self.config.purge_interval;
        let mut rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = retention.purge_all().await {
                            warn!("Scheduled purge failed: {e}");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::models::NewScheduledSummary;
    use database::{group, message, ScheduleType};
    use retention::RetentionConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockDispatcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SummaryDispatcher for MockDispatcher {
        async fn dispatch(&self, _schedule_id: i64) -> Result<i64, PosterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }
    }

    async fn scheduler_for(db: &Database) -> Scheduler<MockDispatcher> {
        Scheduler::new(
            db.clone(),
            Arc::new(MockDispatcher {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(RetentionEngine::new(db.clone(), RetentionConfig::default())),
            SchedulerConfig::default(),
        )
    }

    async fn seed(db: &Database) {
        group::upsert_group(db.pool(), "src", "Source", "").await.unwrap();
        group::upsert_group(db.pool(), "dst", "Target", "").await.unwrap();
    }

    fn new_schedule(name: &str, times: Vec<&str>) -> NewScheduledSummary {
        NewScheduledSummary {
            name: name.to_string(),
            source_group_id: "src".to_string(),
            target_group_id: "dst".to_string(),
            schedule_times: times.into_iter().map(String::from).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reload_registers_one_trigger_per_time() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        seed(&db).await;
        schedule::create(db.pool(), &new_schedule("two-a-day", vec!["09:00", "21:00"]))
            .await
            .unwrap();
        let mut weekly = new_schedule("weekly", vec!["10:00"]);
        weekly.schedule_type = ScheduleType::Weekly;
        weekly.schedule_day_of_week = Some(0);
        schedule::create(db.pool(), &weekly).await.unwrap();

        let disabled = schedule::create(db.pool(), &new_schedule("off", vec!["12:00"]))
            .await
            .unwrap();
        schedule::set_enabled(db.pool(), disabled.id, false).await.unwrap();

        let scheduler = scheduler_for(&db).await;
        assert_eq!(scheduler.start().await.unwrap(), 3);
        assert_eq!(scheduler.trigger_count().await, 3);

        scheduler.stop().await;
        assert_eq!(scheduler.trigger_count().await, 0);
    }

    #[tokio::test]
    async fn reload_picks_up_new_schedules() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        seed(&db).await;

        let scheduler = scheduler_for(&db).await;
        assert_eq!(scheduler.start().await.unwrap(), 0);

        schedule::create(db.pool(), &new_schedule("late", vec!["08:00"]))
            .await
            .unwrap();
        assert_eq!(scheduler.reload().await.unwrap(), 1);

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn start_runs_the_catchup_purge() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        seed(&db).await;

        message::store_message(db.pool(), 1, "alice", "src", Some("stale"))
            .await
            .unwrap();
        sqlx::query("UPDATE messages SET stored_at = datetime('now', '-100 hours')")
            .execute(db.pool())
            .await
            .unwrap();

        let scheduler = scheduler_for(&db).await;
        scheduler.start().await.unwrap();

        let left = message::messages_for_group(db.pool(), "src", None, None)
            .await
            .unwrap();
        assert!(left.is_empty(), "startup purge removed the stale message");
        scheduler.stop().await;
    }
}
