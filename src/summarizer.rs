//! AI summaries of report text, served by a local Ollama instance.

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::PortalConfig;
use crate::error::PortalError;

const SYSTEM_PROMPT: &str = "You are a medical assistant. Provide a concise summary of the \
following medical report text. Extract key findings, diagnoses, abnormal values and treatments \
mentioned. Present the summary as clean text, without markdown or headers.";

pub trait ReportSummarizer: Send + Sync {
    fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, PortalError>>;
}

/// Build the summarizer the configuration asks for.
pub fn from_config(config: &PortalConfig) -> Result<Box<dyn ReportSummarizer>, PortalError> {
    match &config.summarizer_url {
        Some(url) => Ok(Box::new(OllamaSummarizer::new(
            url,
            &config.summarizer_model,
            config.summarizer_timeout_secs,
        )?)),
        None => Ok(Box::new(DisabledSummarizer)),
    }
}

/// Ollama HTTP client for report summaries.
pub struct OllamaSummarizer {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaSummarizer {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, PortalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PortalError::ServiceUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    async fn generate(&self, text: &str) -> Result<String, PortalError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = format!("--- REPORT TEXT ---\n{text}\n\n--- SUMMARY ---");
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &prompt,
            system: SYSTEM_PROMPT,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    PortalError::ServiceUnavailable(format!(
                        "AI service unreachable at {}",
                        self.base_url
                    ))
                } else if e.is_timeout() {
                    PortalError::ServiceUnavailable(format!(
                        "AI service timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    PortalError::ServiceUnavailable(format!("AI service request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "Summarizer returned an error");
            return Err(PortalError::ServiceUnavailable(format!(
                "AI service error (HTTP {})",
                status.as_u16()
            )));
        }

        let parsed: OllamaGenerateResponse = response.json().await.map_err(|e| {
            PortalError::ServiceUnavailable(format!("AI service response unreadable: {e}"))
        })?;

        let summary = parsed.response.trim();
        if summary.is_empty() {
            return Err(PortalError::ServiceUnavailable(
                "AI service returned an empty summary".into(),
            ));
        }
        Ok(summary.to_string())
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl ReportSummarizer for OllamaSummarizer {
    fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, PortalError>> {
        Box::pin(self.generate(text))
    }
}

/// Used when no summarizer URL is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSummarizer;

impl ReportSummarizer for DisabledSummarizer {
    fn summarize<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<String, PortalError>> {
        Box::pin(async {
            Err(PortalError::ServiceUnavailable(
                "AI summarization is not configured".into(),
            ))
        })
    }
}

/// Returns a fixed summary. Test double.
#[cfg(test)]
pub struct MockSummarizer {
    pub response: Result<String, String>,
}

#[cfg(test)]
impl ReportSummarizer for MockSummarizer {
    fn summarize<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<String, PortalError>> {
        let result = self
            .response
            .clone()
            .map_err(PortalError::ServiceUnavailable);
        Box::pin(async move { result })
    }
}
