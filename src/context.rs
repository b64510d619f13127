//! Explicit run context.
//!
//! A [`RunContext`] owns the collaborators a run needs (inference backend,
//! quality scorer, memory probe, OCR engine) and hands out borrowing
//! [`Summarizer`], [`PageTextExtractor`], and [`Harness`] values. It is built
//! once by the caller, used for any number of calls, and released with
//! [`RunContext::shutdown`].

use anyhow::Result;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::extract::PageTextExtractor;
use crate::harness::Harness;
use crate::memory::{MemoryProbe, SystemMemory};
use crate::ocr::{PageOcr, TesseractOcr};
use crate::ollama::{InferenceBackend, OllamaClient};
use crate::scoring::{MetricScorer, QualityScorer};
use crate::summarize::{Summarizer, SummarizerSettings};

pub struct RunContext {
    backend: Box<dyn InferenceBackend>,
    scorer: Box<dyn QualityScorer>,
    memory: Box<dyn MemoryProbe>,
    ocr: Box<dyn PageOcr>,
    settings: SummarizerSettings,
    max_length: u32,
}

impl RunContext {
    /// Assemble a context from explicit parts.
    pub fn new(
        backend: Box<dyn InferenceBackend>,
        scorer: Box<dyn QualityScorer>,
        memory: Box<dyn MemoryProbe>,
        ocr: Box<dyn PageOcr>,
        settings: SummarizerSettings,
        max_length: u32,
    ) -> Self {
        Self {
            backend,
            scorer,
            memory,
            ocr,
            settings,
            max_length,
        }
    }

    /// Ollama backend, ROUGE plus the configured embedding provider, host
    /// memory counter, and tesseract OCR.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = OllamaClient::new(&config.ollama)?;
        tracing::debug!(url = backend.url(), "inference backend ready");

        let scorer = MetricScorer::new(create_provider(&config.embedding)?);
        match scorer.embedding_model() {
            Some(model) => tracing::debug!(model, "embedding provider ready"),
            None => tracing::debug!("embedding provider disabled, semantic score will be empty"),
        }

        Ok(Self::new(
            Box::new(backend),
            Box::new(scorer),
            Box::new(SystemMemory::new()),
            Box::new(TesseractOcr::from_config(&config.extract)),
            SummarizerSettings::from_config(&config.summarize),
            config.summarize.max_length,
        ))
    }

    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    /// Override the summary length target for subsequent calls.
    pub fn set_max_length(&mut self, max_length: u32) {
        self.max_length = max_length;
    }

    pub fn summarizer(&self) -> Summarizer<'_> {
        Summarizer::new(self.backend.as_ref(), self.settings)
    }

    pub fn extractor(&self) -> PageTextExtractor<'_> {
        PageTextExtractor::new(self.ocr.as_ref())
    }

    pub fn harness(&mut self) -> Harness<'_> {
        Harness::new(
            Summarizer::new(self.backend.as_ref(), self.settings),
            self.scorer.as_ref(),
            self.memory.as_mut(),
            self.max_length,
        )
    }

    /// Release the backend, scorer, and embedding model.
    pub fn shutdown(self) {
        tracing::debug!("run context released");
        drop(self);
    }
}
