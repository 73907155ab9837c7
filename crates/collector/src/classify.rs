//! Envelope classification.

use signal_daemon::types::{Envelope, ReactionInfo};

/// What an envelope means to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// A text message in a group.
    GroupText {
        group_id: String,
        sender_id: String,
        /// Sender-assigned epoch milliseconds.
        origin_timestamp: i64,
        content: Option<String>,
        /// Disappearing-message duration in seconds, 0 if disabled.
        expires_in_seconds: u32,
    },

    /// A reaction to a group message.
    GroupReaction {
        group_id: String,
        reactor_id: String,
        origin_timestamp: i64,
        reaction: ReactionInfo,
    },

    /// A one-to-one message to the bot.
    DirectMessage {
        sender_id: String,
        origin_timestamp: i64,
        content: String,
    },

    /// Nothing to do for this envelope.
    Ignored(IgnoreReason),
}

/// Why an envelope was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No data message: receipts, typing indicators, and the like.
    NoContent,
    /// Group membership or metadata change.
    GroupUpdate,
    /// A reaction outside any group; those are not tracked.
    DirectReaction,
    /// A direct envelope without text.
    EmptyDirect,
}

/// Classify one envelope. Linked-device sync envelopes are looked through,
/// so a message typed on the account owner's desktop ingests like any
/// other.
pub fn classify(envelope: &Envelope) -> Classified {
    let Some(data) = envelope.effective_data_message() else {
        return Classified::Ignored(IgnoreReason::NoContent);
    };

    let sender_id = envelope.sender_id().to_string();
    let origin_timestamp = if data.timestamp > 0 {
        data.timestamp as i64
    } else {
        envelope.timestamp as i64
    };

    match &data.group_info {
        Some(group) => {
            if group.r#type.as_deref() == Some("UPDATE") {
                return Classified::Ignored(IgnoreReason::GroupUpdate);
            }
            if let Some(reaction) = &data.reaction {
                return Classified::GroupReaction {
                    group_id: group.group_id.clone(),
                    reactor_id: sender_id,
                    origin_timestamp,
                    reaction: reaction.clone(),
                };
            }
            Classified::GroupText {
                group_id: group.group_id.clone(),
                sender_id,
                origin_timestamp,
                content: data.message.clone(),
                expires_in_seconds: data.expires_in_seconds,
            }
        }
        None => {
            if data.reaction.is_some() {
                return Classified::Ignored(IgnoreReason::DirectReaction);
            }
            match data.message.as_deref() {
                Some(text) if !text.trim().is_empty() => Classified::DirectMessage {
                    sender_id,
                    origin_timestamp,
                    content: text.to_string(),
                },
                _ => Classified::Ignored(IgnoreReason::EmptyDirect),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_daemon::types::{DataMessage, GroupInfo};

    fn base_envelope(ts: u64) -> Envelope {
        Envelope {
            source_uuid: Some("uuid-1".to_string()),
            timestamp: ts,
            ..Default::default()
        }
    }

    #[test]
    fn group_text_classified() {
        let mut envelope = base_envelope(100);
        envelope.data_message = Some(DataMessage {
            timestamp: 200,
            message: Some("hi".to_string()),
            expires_in_seconds: 3600,
            group_info: Some(GroupInfo {
                group_id: "g1".to_string(),
                r#type: Some("DELIVER".to_string()),
            }),
            ..Default::default()
        });

        match classify(&envelope) {
            Classified::GroupText {
                group_id,
                sender_id,
                origin_timestamp,
                content,
                expires_in_seconds,
            } => {
                assert_eq!(group_id, "g1");
                assert_eq!(sender_id, "uuid-1");
                assert_eq!(origin_timestamp, 200, "data timestamp wins");
                assert_eq!(content.as_deref(), Some("hi"));
                assert_eq!(expires_in_seconds, 3600);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn group_reaction_classified() {
        let reaction = ReactionInfo {
            emoji: "👍".to_string(),
            is_remove: false,
            target_author_uuid: Some("uuid-2".to_string()),
            target_sent_timestamp: 150,
            ..Default::default()
        };
        let mut envelope = base_envelope(300);
        envelope.data_message = Some(DataMessage {
            timestamp: 300,
            reaction: Some(reaction.clone()),
            group_info: Some(GroupInfo {
                group_id: "g1".to_string(),
                r#type: None,
            }),
            ..Default::default()
        });

        assert_eq!(
            classify(&envelope),
            Classified::GroupReaction {
                group_id: "g1".to_string(),
                reactor_id: "uuid-1".to_string(),
                origin_timestamp: 300,
                reaction,
            }
        );
    }

    #[test]
    fn group_update_ignored() {
        let mut envelope = base_envelope(100);
        envelope.data_message = Some(DataMessage {
            group_info: Some(GroupInfo {
                group_id: "g1".to_string(),
                r#type: Some("UPDATE".to_string()),
            }),
            ..Default::default()
        });
        assert_eq!(
            classify(&envelope),
            Classified::Ignored(IgnoreReason::GroupUpdate)
        );
    }

    #[test]
    fn bare_envelope_ignored() {
        assert_eq!(
            classify(&base_envelope(100)),
            Classified::Ignored(IgnoreReason::NoContent)
        );
    }

    #[test]
    fn direct_text_classified() {
        let mut envelope = base_envelope(500);
        envelope.data_message = Some(DataMessage {
            message: Some("hello bot".to_string()),
            ..Default::default()
        });
        match classify(&envelope) {
            Classified::DirectMessage {
                sender_id,
                origin_timestamp,
                content,
            } => {
                assert_eq!(sender_id, "uuid-1");
                assert_eq!(origin_timestamp, 500, "envelope timestamp fallback");
                assert_eq!(content, "hello bot");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn blank_direct_ignored() {
        let mut envelope = base_envelope(500);
        envelope.data_message = Some(DataMessage {
            message: Some("   ".to_string()),
            ..Default::default()
        });
        assert_eq!(
            classify(&envelope),
            Classified::Ignored(IgnoreReason::EmptyDirect)
        );
    }
}
