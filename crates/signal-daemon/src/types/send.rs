//! Types for sending messages via signal-cli daemon.

use serde::{Deserialize, Serialize};

/// Parameters for sending a message.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    /// Recipients (phone numbers or UUIDs).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipient: Vec<String>,

    /// Group IDs to send to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_id: Vec<String>,

    /// The message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Account to send from (multi-account mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl SendParams {
    /// Create send params for a text message to an individual user.
    pub fn text(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient: vec![recipient.into()],
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create send params for a text message to a group.
    pub fn group(group_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group_id: vec![group_id.into()],
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Result of sending a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    /// Timestamp assigned to the sent message.
    pub timestamp: u64,
}
