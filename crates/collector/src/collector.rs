//! The collection loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use database::{group, message, reaction, settings, Database, RetentionSource};
use signal_daemon::types::Envelope;
use signal_daemon::SignalTransport;

use crate::classify::{classify, Classified, IgnoreReason};
use crate::dm::DmHandler;
use crate::error::CollectorError;
use crate::seen::{BoundedSeenSet, SeenKey};

/// Tuning for the collection loop.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// How long one `receive` call waits for new envelopes.
    pub receive_timeout: Duration,
    /// Max `receive` calls per collection pass; an empty batch ends the
    /// pass early.
    pub drain_attempts: usize,
    /// Pause between passes when a pass processed nothing, including
    /// passes where every receive attempt failed.
    pub poll_interval: Duration,
    /// Capacity of the in-memory duplicate guard.
    pub seen_capacity: usize,
    /// Retention written back when a group's disappearing-message timer
    /// is off.
    pub default_retention_hours: i64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_secs(5),
            drain_attempts: 3,
            poll_interval: Duration::from_secs(1),
            seen_capacity: 10_000,
            default_retention_hours: 48,
        }
    }
}

/// Counters for one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub messages_stored: u64,
    pub messages_duplicate: u64,
    /// Messages whose group could not be resolved even after a resync.
    pub messages_dropped: u64,
    pub reactions_stored: u64,
    pub reactions_updated: u64,
    pub reactions_orphaned: u64,
    pub dms_handled: u64,
    pub ignored: u64,
}

impl CollectStats {
    pub fn total_processed(&self) -> u64 {
        self.messages_stored
            + self.messages_duplicate
            + self.messages_dropped
            + self.reactions_stored
            + self.reactions_updated
            + self.reactions_orphaned
            + self.dms_handled
            + self.ignored
    }
}

/// Drains the transport and persists what it finds.
pub struct MessageCollector<T: SignalTransport> {
    transport: Arc<T>,
    db: Database,
    dm_handler: Arc<dyn DmHandler>,
    seen: Mutex<BoundedSeenSet>,
    config: CollectorConfig,
}

impl<T: SignalTransport> MessageCollector<T> {
    pub fn new(
        transport: Arc<T>,
        db: Database,
        dm_handler: Arc<dyn DmHandler>,
        config: CollectorConfig,
    ) -> Self {
        let seen = Mutex::new(BoundedSeenSet::new(config.seen_capacity));
        Self {
            transport,
            db,
            dm_handler,
            seen,
            config,
        }
    }

    /// Refresh the group registry from the transport. Returns how many
    /// groups were recorded.
    pub async fn sync_groups(&self) -> Result<usize, CollectorError> {
        let groups = self.transport.list_groups().await?;
        for record in &groups {
            group::upsert_group(
                self.db.pool(),
                &record.id,
                record.name.as_deref().unwrap_or(&record.id),
                record.description.as_deref().unwrap_or(""),
            )
            .await?;
        }
        info!(count = groups.len(), "Synced groups from transport");
        Ok(groups.len())
    }

    /// One collection pass: drain up to `drain_attempts` batches, stopping
    /// early once a batch comes back empty. A transport error aborts only
    /// its own attempt, and a failure while persisting one envelope does
    /// not abort the rest of its batch.
    pub async fn collect(&self) -> Result<CollectStats, CollectorError> {
        let mut stats = CollectStats::default();

        for attempt in 0..self.config.drain_attempts {
            let envelopes = match self.transport.receive(self.config.receive_timeout).await {
                Ok(envelopes) => envelopes,
                Err(e) => {
                    warn!(attempt, "Receive attempt failed: {e}");
                    continue;
                }
            };
            if envelopes.is_empty() {
                debug!(attempt, "Receive queue drained");
                break;
            }
            for envelope in &envelopes {
                if let Err(e) = self.process_envelope(envelope, &mut stats).await {
                    warn!("Envelope processing failed: {e}");
                }
            }
        }

        if stats.total_processed() > 0 {
            debug!(?stats, "Collection pass finished");
        }
        Ok(stats)
    }

    /// Run collection passes until `shutdown` flips to true. Passes that
    /// processed nothing are followed by a `poll_interval` pause, so an
    /// outage idles the loop instead of spinning it.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), CollectorError> {
        info!("Collector loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let idle = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.collect() => match result {
                    Ok(stats) => stats.total_processed() == 0,
                    Err(e) => {
                        // Transport hiccups are expected; keep polling.
                        warn!("Collection pass failed: {e}");
                        true
                    }
                }
            };
            if idle {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
        info!("Collector loop stopped");
        Ok(())
    }

    async fn process_envelope(
        &self,
        envelope: &Envelope,
        stats: &mut CollectStats,
    ) -> Result<(), CollectorError> {
        match classify(envelope) {
            Classified::GroupText {
                group_id,
                sender_id,
                origin_timestamp,
                content,
                expires_in_seconds,
            } => {
                if !self.resolve_group(&group_id).await? {
                    warn!(group_id, "Dropping message for unresolvable group");
                    stats.messages_dropped += 1;
                    return Ok(());
                }

                let key = SeenKey::Message {
                    origin_timestamp,
                    sender_id: sender_id.clone(),
                    group_id: group_id.clone(),
                };
                if !self.seen.lock().await.insert(key) {
                    stats.messages_duplicate += 1;
                    return Ok(());
                }

                let (_, is_new) = message::store_message(
                    self.db.pool(),
                    origin_timestamp,
                    &sender_id,
                    &group_id,
                    content.as_deref(),
                )
                .await?;
                if is_new {
                    stats.messages_stored += 1;
                } else {
                    stats.messages_duplicate += 1;
                }

                self.learn_retention(&group_id, expires_in_seconds).await?;
            }

            Classified::GroupReaction {
                group_id,
                reactor_id,
                origin_timestamp,
                reaction,
            } => {
                let key = SeenKey::Reaction {
                    origin_timestamp,
                    reactor_id: reactor_id.clone(),
                    group_id: group_id.clone(),
                };
                if !self.seen.lock().await.insert(key) {
                    stats.reactions_updated += 1;
                    return Ok(());
                }

                let author = reaction
                    .target_author_uuid
                    .as_deref()
                    .or(reaction.target_author.as_deref());
                let target = message::find_by_origin(
                    self.db.pool(),
                    &group_id,
                    reaction.target_sent_timestamp as i64,
                    author,
                )
                .await?;

                match target {
                    Some(target) if reaction.is_remove => {
                        reaction::remove_reaction(self.db.pool(), target.id, &reactor_id).await?;
                        stats.reactions_updated += 1;
                    }
                    Some(target) => {
                        let is_new = reaction::upsert_reaction(
                            self.db.pool(),
                            target.id,
                            &reaction.emoji,
                            &reactor_id,
                            origin_timestamp,
                        )
                        .await?;
                        if is_new {
                            stats.reactions_stored += 1;
                        } else {
                            stats.reactions_updated += 1;
                        }
                    }
                    None => {
                        // Target was never stored or already purged.
                        debug!(
                            group_id,
                            target_timestamp = reaction.target_sent_timestamp,
                            "Reaction target not found"
                        );
                        stats.reactions_orphaned += 1;
                    }
                }
            }

            Classified::DirectMessage {
                sender_id,
                origin_timestamp,
                content,
            } => {
                let reply = self
                    .dm_handler
                    .handle(&sender_id, &content, origin_timestamp)
                    .await?;
                if let Some(text) = reply {
                    self.transport.send_to_user(&sender_id, &text).await?;
                }
                stats.dms_handled += 1;
            }

            Classified::Ignored(reason) => {
                if matches!(reason, IgnoreReason::GroupUpdate) {
                    // Membership or metadata changed; refresh the registry.
                    self.sync_groups().await?;
                }
                debug!(?reason, "Envelope ignored");
                stats.ignored += 1;
            }
        }
        Ok(())
    }

    /// Messages must reference a known group. An unknown id triggers one
    /// metadata resync; if the group still does not resolve the message is
    /// dropped rather than stored against a dangling reference.
    async fn resolve_group(&self, group_id: &str) -> Result<bool, CollectorError> {
        if group::find_group(self.db.pool(), group_id).await?.is_some() {
            return Ok(true);
        }
        debug!(group_id, "Unknown group, resyncing registry");
        self.sync_groups().await?;
        Ok(group::find_group(self.db.pool(), group_id).await?.is_some())
    }

    /// Track the group's disappearing-message timer as its retention,
    /// rounded down to whole hours with a one hour floor. A disabled timer
    /// targets the configured default, so a previously learned value is
    /// reverted when the timer goes away. No-op when the stored value
    /// already matches, when a fresh group targets the default anyway, or
    /// when a command-set value is in place.
    async fn learn_retention(
        &self,
        group_id: &str,
        expires_in_seconds: u32,
    ) -> Result<(), CollectorError> {
        let hours = if expires_in_seconds > 0 {
            (i64::from(expires_in_seconds) / 3600).max(1)
        } else {
            self.config.default_retention_hours
        };

        match settings::get_group_settings(self.db.pool(), group_id).await? {
            Some(current)
                if current.retention_hours == hours
                    || current.source == RetentionSource::Command =>
            {
                return Ok(())
            }
            None if hours == self.config.default_retention_hours => return Ok(()),
            _ => {}
        }

        let applied =
            settings::set_group_retention(self.db.pool(), group_id, hours, RetentionSource::Signal)
                .await?;
        if applied {
            debug!(group_id, hours, "Learned retention from message expiry");
        }
        Ok(())
    }
}
