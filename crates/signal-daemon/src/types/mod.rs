//! Wire types for the signal-cli daemon JSON-RPC API.

pub mod envelope;
pub mod send;

pub use envelope::{DataMessage, Envelope, GroupInfo, ReactionInfo, ReceiveEntry, SentMessage, SyncMessage};
pub use send::{SendParams, SendResult};

use serde::{Deserialize, Serialize};

/// A group record as returned by the daemon's `listGroups` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    /// Opaque group ID (base64 encoded).
    #[serde(default)]
    pub id: String,

    /// Group display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Group description.
    #[serde(default)]
    pub description: Option<String>,
}
