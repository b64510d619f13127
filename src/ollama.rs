//! Inference service client.
//!
//! Defines the [`InferenceBackend`] trait (one blocking generation
//! round-trip per call) and the [`OllamaClient`] implementation, which calls
//! `POST /api/generate` on a local Ollama instance with streaming disabled.
//!
//! There are no retries: a failed call is returned to the caller as-is.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::config::OllamaConfig;

/// Raw reply of a generation call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateReply {
    /// Generated text.
    pub response: String,
    /// Number of generated tokens, when reported.
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Generation time in nanoseconds, when reported.
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

/// A service that turns a prompt into generated text.
pub trait InferenceBackend {
    fn generate(&self, model: &str, prompt: &str) -> Result<GenerateReply>;
}

/// Blocking client for Ollama's generate endpoint.
///
/// Requires Ollama to be running with the requested models pulled
/// (e.g. `ollama pull llama3.2:1b`).
pub struct OllamaClient {
    url: String,
    http: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        builder = if config.timeout_secs > 0 {
            builder.timeout(Duration::from_secs(config.timeout_secs))
        } else {
            builder.timeout(None)
        };
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            url: config.url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl InferenceBackend for OllamaClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<GenerateReply> {
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .with_context(|| {
                format!(
                    "Ollama connection error (is Ollama running at {}?)",
                    self.url
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let reply: GenerateReply = response
            .json()
            .context("Invalid Ollama response: expected a generate reply")?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_without_counters_decodes() {
        let reply: GenerateReply =
            serde_json::from_str(r#"{"model":"m","response":"hi","done":true}"#).unwrap();
        assert_eq!(reply.response, "hi");
        assert_eq!(reply.eval_count, None);
        assert_eq!(reply.eval_duration, None);
    }

    #[test]
    fn reply_with_counters_decodes() {
        let reply: GenerateReply = serde_json::from_str(
            r#"{"response":"x","eval_count":100,"eval_duration":2000000000}"#,
        )
        .unwrap();
        assert_eq!(reply.eval_count, Some(100));
        assert_eq!(reply.eval_duration, Some(2_000_000_000));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OllamaClient::new(&OllamaConfig {
            url: "http://localhost:11434/".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.url(), "http://localhost:11434");
    }

    #[test]
    fn unreachable_service_is_an_error() {
        let client = OllamaClient::new(&OllamaConfig {
            url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
        })
        .unwrap();
        let err = client.generate("m", "p").unwrap_err();
        assert!(format!("{:#}", err).contains("Ollama connection error"));
    }
}
