use thiserror::Error;

use database::DatabaseError;
use signal_daemon::DaemonError;

/// Errors from the ingestion pipeline.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
