//! Full evaluation pipeline: input → text → harness → persisted table.
//!
//! Input is either raw text or a document path. A document that does not
//! exist is the only condition that makes the run report failure; every
//! per-model problem is absorbed by the harness and the run still succeeds
//! with whatever rows it produced.
//!
//! # Reference policy
//!
//! | Input | `--reference` given | Reference used |
//! |-------|---------------------|----------------|
//! | any | yes | the given reference |
//! | raw text | no | first `reference_prefix_chars` characters of the text |
//! | document | no | `evaluation.reference_summary` |
//!
//! The text prefix is a crude stand-in used only when no real reference
//! exists.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::Config;
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::harness::EvaluationReport;
use crate::progress::ProgressReporter;
use crate::store;
use crate::summarize::truncate_chars;

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationInput {
    Text(String),
    Document(PathBuf),
}

/// One evaluation run, resolved from CLI flags over config defaults.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub input: EvaluationInput,
    /// Explicit reference summary; overrides the policy above.
    pub reference: Option<String>,
    pub default_reference: String,
    pub reference_prefix_chars: usize,
    pub models: Vec<String>,
    pub output: PathBuf,
    /// Append to `output` instead of overwriting it.
    pub append: bool,
    pub ocr_fallback: bool,
}

impl EvaluationRequest {
    /// Config defaults: the default document, configured models, and
    /// results path, overwriting.
    pub fn from_config(config: &Config) -> Self {
        let eval = &config.evaluation;
        Self {
            input: EvaluationInput::Document(eval.default_document.clone()),
            reference: None,
            default_reference: eval.reference_summary.clone(),
            reference_prefix_chars: eval.reference_prefix_chars,
            models: eval.models.clone(),
            output: eval.results_path.clone(),
            append: false,
            ocr_fallback: config.extract.ocr_fallback,
        }
    }

    /// Evaluate raw `text` instead of a document.
    ///
    /// Blank text counts as no text: the current input (the default
    /// document unless changed) is kept.
    pub fn set_text(&mut self, text: String) {
        if text.trim().is_empty() {
            tracing::warn!("text input is blank, evaluating the document instead");
            return;
        }
        self.input = EvaluationInput::Text(text);
    }

    /// The reference summary to score against, given the source `text`.
    pub fn resolve_reference(&self, text: &str) -> String {
        if let Some(reference) = &self.reference {
            return reference.clone();
        }
        match self.input {
            EvaluationInput::Text(_) => {
                truncate_chars(text, self.reference_prefix_chars).to_string()
            }
            EvaluationInput::Document(_) => self.default_reference.clone(),
        }
    }
}

/// Outcome of [`run_evaluation`].
#[derive(Debug)]
pub struct PipelineRun {
    /// False only when the input document could not be found.
    pub success: bool,
    pub report: EvaluationReport,
}

/// Run the whole pipeline and persist the resulting table.
///
/// # Errors
///
/// Extraction failures other than a missing document, and failures to
/// write the result file.
pub fn run_evaluation(
    ctx: &mut RunContext,
    request: &EvaluationRequest,
    progress: &dyn ProgressReporter,
) -> Result<PipelineRun> {
    let text = match &request.input {
        EvaluationInput::Text(text) => text.clone(),
        EvaluationInput::Document(path) => {
            let extracted = ctx
                .extractor()
                .with_progress(progress)
                .extract(path, request.ocr_fallback);
            match extracted {
                Ok(extracted) => {
                    tracing::info!(
                        path = %path.display(),
                        pages = extracted.page_count(),
                        ocr_pages = extracted.ocr_pages(),
                        "document extracted"
                    );
                    extracted.joined()
                }
                Err(PipelineError::NotFound(missing)) => {
                    tracing::error!(
                        path = %missing.display(),
                        "document not found, nothing evaluated"
                    );
                    return Ok(PipelineRun {
                        success: false,
                        report: EvaluationReport::default(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    if text.trim().is_empty() {
        tracing::warn!("input text is empty, every model will be skipped");
    }

    let reference = request.resolve_reference(&text);
    let report = ctx
        .harness()
        .with_progress(progress)
        .run(&text, &reference, &request.models);

    let table = report.table();
    if request.append {
        store::append(&request.output, &table)?;
    } else {
        store::save(&request.output, &table)?;
    }
    tracing::info!(
        path = %request.output.display(),
        rows = table.len(),
        skipped = report.failures().len(),
        "results written"
    );

    Ok(PipelineRun {
        success: true,
        report,
    })
}
