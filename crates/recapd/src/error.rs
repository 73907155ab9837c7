use thiserror::Error;

/// Top-level failures surfaced to the operator.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Database(#[from] database::DatabaseError),

    #[error(transparent)]
    Daemon(#[from] signal_daemon::DaemonError),

    #[error(transparent)]
    Summarizer(#[from] summarizer::SummarizerError),

    #[error(transparent)]
    Collector(#[from] collector::CollectorError),

    #[error(transparent)]
    Retention(#[from] retention::RetentionError),

    #[error(transparent)]
    Scheduler(#[from] scheduler::SchedulerError),

    #[error(transparent)]
    Poster(#[from] summary_poster::PosterError),

    #[error("no schedule named {0:?}")]
    UnknownSchedule(String),
}
