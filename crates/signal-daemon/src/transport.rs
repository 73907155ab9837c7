//! The transport seam the rest of the system programs against.

use std::time::Duration;

use async_trait::async_trait;

use crate::client::SignalClient;
use crate::error::DaemonError;
use crate::types::{Envelope, GroupRecord, SendParams};

/// Abstract transport to the chat system.
///
/// [`SignalClient`] is the production implementation; tests substitute
/// in-memory mocks. Sending is fire-and-forget from the caller's
/// perspective: delivery failures surface as errors to log, not retry.
#[async_trait]
pub trait SignalTransport: Send + Sync {
    /// Drain queued envelopes, waiting up to `timeout` for new ones.
    async fn receive(&self, timeout: Duration) -> Result<Vec<Envelope>, DaemonError>;

    /// List group metadata for all groups the account belongs to.
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, DaemonError>;

    /// Send text to a group.
    async fn send_to_group(&self, group_id: &str, message: &str) -> Result<(), DaemonError>;

    /// Send text to an individual user.
    async fn send_to_user(&self, user_id: &str, message: &str) -> Result<(), DaemonError>;
}

#[async_trait]
impl SignalTransport for SignalClient {
    async fn receive(&self, timeout: Duration) -> Result<Vec<Envelope>, DaemonError> {
        SignalClient::receive(self, timeout).await
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, DaemonError> {
        SignalClient::list_groups(self).await
    }

    async fn send_to_group(&self, group_id: &str, message: &str) -> Result<(), DaemonError> {
        self.send(SendParams::group(group_id, message)).await?;
        Ok(())
    }

    async fn send_to_user(&self, user_id: &str, message: &str) -> Result<(), DaemonError> {
        self.send(SendParams::text(user_id, message)).await?;
        Ok(())
    }
}
