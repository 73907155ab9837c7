//! Message ingestion pipeline.
//!
//! [`MessageCollector`] drains envelopes from the transport, classifies
//! them, and persists group messages, reactions, and direct messages. A
//! bounded in-memory seen-set short-circuits duplicate deliveries before
//! they reach the database; the unique index on stored messages is the
//! durable backstop.

mod classify;
mod collector;
mod dm;
mod error;
mod seen;

pub use classify::{classify, Classified, IgnoreReason};
pub use collector::{CollectStats, CollectorConfig, MessageCollector};
pub use dm::{DmHandler, StoringDmHandler};
pub use error::CollectorError;
pub use seen::{BoundedSeenSet, SeenKey};
