use thiserror::Error;

/// Errors from summarization backends.
#[derive(Debug, Error)]
pub enum SummarizerError {
    /// Transport failure talking to the model server.
    #[error("summarizer request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model server is down or refused the request.
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    /// The server answered but the body was not usable.
    #[error("invalid summarizer response: {0}")]
    InvalidResponse(String),
}
