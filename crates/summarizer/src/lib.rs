//! LLM summarization backend.
//!
//! The [`Summarizer`] trait is the seam the posting pipeline programs
//! against; [`OllamaSummarizer`] talks to a local Ollama server. Inputs are
//! plain records so callers decide what storage shape feeds them.

mod error;
mod ollama;
mod prompt;

pub use error::SummarizerError;
pub use ollama::{OllamaConfig, OllamaSummarizer};

use async_trait::async_trait;

/// Below this many messages a window is too thin to summarize; the
/// pipeline posts an activity note instead of calling the model.
pub const MIN_MESSAGES_FOR_SUMMARY: usize = 5;

/// One message as fed to the model, with its engagement signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub sender: String,
    pub content: String,
    pub reaction_count: i64,
    pub emojis: Vec<String>,
}

/// A summarization request for one window of group conversation.
#[derive(Debug, Clone)]
pub struct SummaryInput {
    pub group_name: String,
    pub period_hours: i64,
    /// Detailed summaries name topics and decisions; simple ones are a
    /// short paragraph.
    pub detail: bool,
    pub messages: Vec<MessageRecord>,
}

impl SummaryInput {
    /// Whether there is enough conversation to be worth a model call.
    pub fn has_enough_content(&self) -> bool {
        self.messages.len() >= MIN_MESSAGES_FOR_SUMMARY
    }
}

/// Produces natural-language summaries of message windows.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize one window. Callers should check
    /// [`SummaryInput::has_enough_content`] first; implementations may
    /// still refuse thin input.
    async fn summarize(&self, input: &SummaryInput) -> Result<String, SummarizerError>;

    /// Whether the backing model is reachable.
    async fn is_available(&self) -> bool;
}
