//! Core data models used throughout digest-bench.
//!
//! These types represent the extracted pages, summaries, and benchmark
//! records that flow from extraction through summarization to the
//! persisted result table.

use serde::{Deserialize, Serialize};

/// How the text of a page was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrigin {
    /// Text operators in the page content stream.
    Structural,
    /// Rasterized and recognized because structural text was blank.
    Ocr,
}

/// Trimmed text of one physical page.
#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    /// 1-based page number, in physical order.
    pub number: u32,
    pub text: String,
    pub origin: PageOrigin,
}

/// Per-page text of a whole document, in physical page order.
///
/// There is exactly one [`PageText`] per page, including pages that
/// yielded nothing (empty string).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    /// Newline-joined page texts. Empty pages contribute empty lines.
    pub fn joined(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of pages whose text came from OCR.
    pub fn ocr_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.origin == PageOrigin::Ocr)
            .count()
    }
}

/// Outcome of one summarization call.
///
/// `runtime_sec` and `speed_tokens_per_sec` are rounded to two decimals
/// for presentation only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    pub summary: String,
    /// In order of appearance in the model reply.
    pub keywords: Vec<String>,
    pub runtime_sec: f64,
    pub tokens_generated: u64,
    pub speed_tokens_per_sec: f64,
}

impl SummaryResult {
    /// Whitespace-separated word count of the summary.
    pub fn summary_words(&self) -> usize {
        self.summary.split_whitespace().count()
    }
}

/// One benchmark row: a model's runtime, memory, and quality against
/// the harness-supplied reference summary.
///
/// Field order is the persisted column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub model: String,
    pub runtime_s: f64,
    pub tokens: u64,
    /// Approximate: delta of the host memory counter around the call.
    #[serde(rename = "memory_MB")]
    pub memory_mb: f64,
    #[serde(rename = "ROUGE1")]
    pub rouge1: f64,
    #[serde(rename = "ROUGE2")]
    pub rouge2: f64,
    #[serde(rename = "ROUGEL")]
    pub rouge_l: f64,
    /// Embedding-based F1; `None` when no embedding provider is configured.
    #[serde(rename = "BERTScore_F1")]
    pub semantic_f1: Option<f64>,
    pub summary: String,
}

/// Persisted column order.
pub const RESULT_COLUMNS: [&str; 9] = [
    "model",
    "runtime_s",
    "tokens",
    "memory_MB",
    "ROUGE1",
    "ROUGE2",
    "ROUGEL",
    "BERTScore_F1",
    "summary",
];

/// Ordered evaluation records, one per successfully evaluated model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub rows: Vec<EvaluationRecord>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn models(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.model.as_str()).collect()
    }
}
