//! Error taxonomy for the document-to-summary pipeline.
//!
//! Extraction and empty-input failures are surfaced to the caller as-is.
//! Per-model failures ([`PipelineError::ModelInvocation`] and
//! [`PipelineError::MetricComputation`]) are caught by the evaluation
//! harness, logged, and turned into a skipped model.
//!
//! A reply that lacks the `SUMMARY:` / `KEYWORDS:` markers is not an error;
//! see [`ReplyStructure::Degraded`](crate::summarize::ReplyStructure).

use std::path::PathBuf;

/// Errors raised by the core pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The document path does not reference an existing file.
    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Summarization was asked to summarize blank text.
    #[error("input text is empty")]
    EmptyInput,

    /// The document exists but could not be parsed or OCR'd.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The inference service call failed (connection, HTTP status, decode).
    #[error("model '{model}' invocation failed: {source}")]
    ModelInvocation {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// Quality scoring (ROUGE or semantic similarity) failed.
    #[error("scoring summary of model '{model}' failed: {source}")]
    MetricComputation {
        model: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_path() {
        let err = PipelineError::NotFound(PathBuf::from("/tmp/missing.pdf"));
        assert_eq!(err.to_string(), "document not found: /tmp/missing.pdf");
    }

    #[test]
    fn invocation_failure_names_model_and_cause() {
        let err = PipelineError::ModelInvocation {
            model: "m2".into(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert!(err.to_string().contains("m2"));
        assert!(err.to_string().contains("connection refused"));
    }
}
