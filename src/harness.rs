//! Evaluation harness: one summary per model, scored against a reference.
//!
//! Models run strictly in the given order, one at a time. Each model
//! produces a [`ModelOutcome`]; a failure in summarization or scoring is
//! recorded as [`ModelOutcome::Failed`] and the run moves on to the next
//! model. [`EvaluationReport::table`] keeps only the successes, so a run in
//! which every model fails still yields an (empty) table.
//!
//! Memory is sampled immediately before and after each summarization call.
//! See [`crate::memory`] for why the figure is approximate.

use crate::error::PipelineError;
use crate::memory::{delta_mb, MemoryProbe};
use crate::models::{EvaluationRecord, ResultTable};
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
use crate::scoring::QualityScorer;
use crate::summarize::{round2, Summarizer};

/// Result of evaluating one model.
#[derive(Debug)]
pub enum ModelOutcome {
    Scored(EvaluationRecord),
    Failed { model: String, error: PipelineError },
}

impl ModelOutcome {
    pub fn model(&self) -> &str {
        match self {
            ModelOutcome::Scored(record) => &record.model,
            ModelOutcome::Failed { model, .. } => model,
        }
    }
}

/// Every model's outcome, in run order.
#[derive(Debug, Default)]
pub struct EvaluationReport {
    pub outcomes: Vec<ModelOutcome>,
}

impl EvaluationReport {
    /// Records of the models that succeeded, in run order.
    pub fn table(&self) -> ResultTable {
        ResultTable {
            rows: self
                .outcomes
                .iter()
                .filter_map(|o| match o {
                    ModelOutcome::Scored(record) => Some(record.clone()),
                    ModelOutcome::Failed { .. } => None,
                })
                .collect(),
        }
    }

    pub fn failures(&self) -> Vec<(&str, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ModelOutcome::Failed { model, error } => Some((model.as_str(), error)),
                ModelOutcome::Scored(_) => None,
            })
            .collect()
    }
}

pub struct Harness<'a> {
    summarizer: Summarizer<'a>,
    scorer: &'a dyn QualityScorer,
    memory: &'a mut dyn MemoryProbe,
    progress: &'a dyn ProgressReporter,
    max_length: u32,
}

impl<'a> Harness<'a> {
    pub fn new(
        summarizer: Summarizer<'a>,
        scorer: &'a dyn QualityScorer,
        memory: &'a mut dyn MemoryProbe,
        max_length: u32,
    ) -> Self {
        Self {
            summarizer,
            scorer,
            memory,
            progress: &NoProgress,
            max_length,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Evaluate every model in `models` against `reference`.
    pub fn run(&mut self, text: &str, reference: &str, models: &[String]) -> EvaluationReport {
        let total = models.len() as u64;
        let mut report = EvaluationReport::default();

        for (i, model) in models.iter().enumerate() {
            self.progress.report(ProgressEvent::Evaluating {
                model: model.clone(),
                n: i as u64 + 1,
                total,
            });

            let outcome = match self.evaluate_one(text, reference, model) {
                Ok(record) => {
                    tracing::info!(
                        model = %record.model,
                        runtime_s = record.runtime_s,
                        tokens = record.tokens,
                        memory_mb = record.memory_mb,
                        rouge1 = record.rouge1,
                        rouge_l = record.rouge_l,
                        semantic_f1 = ?record.semantic_f1,
                        "model evaluated"
                    );
                    ModelOutcome::Scored(record)
                }
                Err(error) => {
                    tracing::error!(model = %model, error = %error, "skipping model");
                    ModelOutcome::Failed {
                        model: model.clone(),
                        error,
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        report
    }

    fn evaluate_one(
        &mut self,
        text: &str,
        reference: &str,
        model: &str,
    ) -> Result<EvaluationRecord, PipelineError> {
        let before = self.memory.used_bytes();
        let result = self.summarizer.summarize(text, model, self.max_length)?;
        let after = self.memory.used_bytes();

        let scores = self
            .scorer
            .score(&result.summary, reference)
            .map_err(|source| PipelineError::MetricComputation {
                model: model.to_string(),
                source,
            })?;

        Ok(EvaluationRecord {
            model: model.to_string(),
            runtime_s: result.runtime_sec,
            tokens: result.tokens_generated,
            memory_mb: round2(delta_mb(before, after)),
            rouge1: scores.rouge1,
            rouge2: scores.rouge2,
            rouge_l: scores.rouge_l,
            semantic_f1: scores.semantic_f1,
            summary: result.summary,
        })
    }
}
