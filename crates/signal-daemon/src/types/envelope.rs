//! Envelope types received from the signal-cli daemon.

use serde::{Deserialize, Serialize};

/// One entry from a `receive` batch. The daemon wraps each envelope in an
/// outer object carrying the receiving account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveEntry {
    /// The message envelope.
    pub envelope: Envelope,

    /// Account that received the envelope.
    #[serde(default)]
    pub account: Option<String>,
}

/// A message envelope received from Signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Source identifier (phone number or UUID, daemon-version dependent).
    #[serde(default)]
    pub source: String,

    /// Source phone number.
    #[serde(default)]
    pub source_number: Option<String>,

    /// Source UUID.
    #[serde(default)]
    pub source_uuid: Option<String>,

    /// Producer-assigned timestamp (milliseconds since epoch).
    #[serde(default)]
    pub timestamp: u64,

    /// Data message content (regular message or reaction).
    #[serde(default)]
    pub data_message: Option<DataMessage>,

    /// Sync message from a linked device.
    #[serde(default)]
    pub sync_message: Option<SyncMessage>,
}

impl Envelope {
    /// Stable sender identifier, preferring the UUID over the phone number.
    pub fn sender_id(&self) -> &str {
        self.source_uuid
            .as_deref()
            .or(self.source_number.as_deref())
            .unwrap_or(&self.source)
    }

    /// The effective data message, looking through linked-device sync
    /// envelopes (a message sent from another device arrives as
    /// `syncMessage.sentMessage`).
    pub fn effective_data_message(&self) -> Option<&DataMessage> {
        self.data_message.as_ref().or_else(|| {
            self.sync_message
                .as_ref()
                .and_then(|sync| sync.sent_message.as_ref())
                .and_then(|sent| sent.message.as_ref())
        })
    }
}

/// A data message containing the actual message content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    /// Message timestamp.
    #[serde(default)]
    pub timestamp: u64,

    /// The text message content.
    #[serde(default)]
    pub message: Option<String>,

    /// Disappearing-message duration in seconds, 0 if disabled.
    #[serde(default)]
    pub expires_in_seconds: u32,

    /// Group information if this is a group message.
    #[serde(default)]
    pub group_info: Option<GroupInfo>,

    /// Reaction to another message.
    #[serde(default)]
    pub reaction: Option<ReactionInfo>,
}

/// Information about the group a message was sent in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    /// Group ID (base64 encoded).
    #[serde(default)]
    pub group_id: String,

    /// Envelope kind within the group: "DELIVER" for regular messages,
    /// "UPDATE" for membership/metadata changes.
    #[serde(default)]
    pub r#type: Option<String>,
}

/// A reaction to another message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionInfo {
    /// The reaction emoji.
    #[serde(default)]
    pub emoji: String,

    /// Whether this removes a previous reaction.
    #[serde(default)]
    pub is_remove: bool,

    /// Author of the message being reacted to.
    #[serde(default)]
    pub target_author: Option<String>,

    /// Author UUID of the message being reacted to.
    #[serde(default)]
    pub target_author_uuid: Option<String>,

    /// Origin timestamp of the message being reacted to.
    #[serde(default)]
    pub target_sent_timestamp: u64,
}

/// Sync message from a linked device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    /// Sent message sync.
    #[serde(default)]
    pub sent_message: Option<SentMessage>,
}

/// A message sent from another linked device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    /// Timestamp.
    #[serde(default)]
    pub timestamp: u64,

    /// The message content.
    #[serde(default)]
    pub message: Option<DataMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_message_envelope() {
        let json = r#"{
            "envelope": {
                "source": "+15550001111",
                "sourceUuid": "aaaa-bbbb",
                "timestamp": 1700000000123,
                "dataMessage": {
                    "timestamp": 1700000000123,
                    "message": "hello",
                    "expiresInSeconds": 86400,
                    "groupInfo": {"groupId": "grp1", "type": "DELIVER"}
                }
            },
            "account": "+15559998888"
        }"#;

        let entry: ReceiveEntry = serde_json::from_str(json).unwrap();
        let envelope = entry.envelope;
        assert_eq!(envelope.sender_id(), "aaaa-bbbb");
        let data = envelope.effective_data_message().unwrap();
        assert_eq!(data.message.as_deref(), Some("hello"));
        assert_eq!(data.expires_in_seconds, 86400);
        assert_eq!(data.group_info.as_ref().unwrap().group_id, "grp1");
    }

    #[test]
    fn test_parse_reaction_envelope() {
        let json = r#"{
            "source": "+15550001111",
            "timestamp": 1700000001000,
            "dataMessage": {
                "reaction": {
                    "emoji": "👍",
                    "isRemove": false,
                    "targetAuthorUuid": "cccc-dddd",
                    "targetSentTimestamp": 1700000000123
                },
                "groupInfo": {"groupId": "grp1"}
            }
        }"#;

        let envelope: Envelope = serde_json::from_str(json).unwrap();
        let reaction = envelope.data_message.unwrap().reaction.unwrap();
        assert_eq!(reaction.emoji, "👍");
        assert_eq!(reaction.target_sent_timestamp, 1700000000123);
    }

    #[test]
    fn test_sync_message_is_seen_through() {
        let json = r#"{
            "source": "+15550001111",
            "timestamp": 1700000002000,
            "syncMessage": {
                "sentMessage": {
                    "timestamp": 1700000002000,
                    "message": {"message": "from my desktop", "groupInfo": {"groupId": "grp1"}}
                }
            }
        }"#;

        let envelope: Envelope = serde_json::from_str(json).unwrap();
        let data = envelope.effective_data_message().unwrap();
        assert_eq!(data.message.as_deref(), Some("from my desktop"));
    }
}
