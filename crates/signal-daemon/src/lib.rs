//! Client for the signal-cli daemon HTTP API.
//!
//! This crate wraps the daemon's JSON-RPC endpoint with the small surface the
//! summarizer needs:
//!
//! - Receiving queued message envelopes in batches (`receive`)
//! - Sending text to groups and individual users
//! - Listing group metadata for the local registry
//! - Health checking
//!
//! # Example
//!
//! ```no_run
//! use signal_daemon::{DaemonConfig, SignalClient, SignalTransport};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), signal_daemon::DaemonError> {
//! let client = SignalClient::connect(DaemonConfig::default()).await?;
//!
//! for envelope in client.receive(Duration::from_secs(30)).await? {
//!     if let Some(msg) = &envelope.data_message {
//!         println!("{}: {:?}", envelope.sender_id(), msg.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use client::SignalClient;
pub use config::DaemonConfig;
pub use error::DaemonError;
pub use transport::SignalTransport;
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
