//! Ollama-backed summarizer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SummarizerError;
use crate::prompt::build_prompt;
use crate::{Summarizer, SummaryInput};

/// Configuration for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Generation can be slow on modest hardware.
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Summarizer backed by Ollama's `/api/generate` endpoint.
pub struct OllamaSummarizer {
    http: Client,
    config: OllamaConfig,
}

impl OllamaSummarizer {
    pub fn new(config: OllamaConfig) -> Result<Self, SummarizerError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SummarizerError::Http)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, input: &SummaryInput) -> Result<String, SummarizerError> {
        let prompt = build_prompt(input);
        debug!(
            model = %self.config.model,
            messages = input.messages.len(),
            "Requesting summary"
        );

        let request = GenerateRequest {
            model: &self.config.model,
            prompt: &prompt,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    SummarizerError::Unavailable(e.to_string())
                } else {
                    SummarizerError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::InvalidResponse(e.to_string()))?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(SummarizerError::InvalidResponse(
                "model returned empty text".to_string(),
            ));
        }
        Ok(text)
    }

    async fn is_available(&self) -> bool {
        match self
            .http
            .get(format!("{}/api/tags", self.config.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("Ollama unreachable: {e}");
                false
            }
        }
    }
}
