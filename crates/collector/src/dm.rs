//! Direct-message handling seam.

use async_trait::async_trait;

use database::{dm, Database};

use crate::error::CollectorError;

/// Handles one-to-one messages addressed to the bot. The collector sends
/// whatever reply the handler returns.
#[async_trait]
pub trait DmHandler: Send + Sync {
    async fn handle(
        &self,
        sender_id: &str,
        content: &str,
        origin_timestamp: i64,
    ) -> Result<Option<String>, CollectorError>;
}

/// Default handler: record the turn so DM retention applies, reply with
/// nothing.
pub struct StoringDmHandler {
    db: Database,
}

impl StoringDmHandler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DmHandler for StoringDmHandler {
    async fn handle(
        &self,
        sender_id: &str,
        content: &str,
        origin_timestamp: i64,
    ) -> Result<Option<String>, CollectorError> {
        dm::store_dm_message(
            self.db.pool(),
            sender_id,
            "user",
            content,
            Some(origin_timestamp),
        )
        .await?;
        Ok(None)
    }
}
