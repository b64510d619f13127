//! Summary quality scoring against a reference summary.
//!
//! Two families of metrics are computed for every generated summary:
//!
//! - **Lexical overlap**: ROUGE-1, ROUGE-2, and ROUGE-L F-measures
//!   (see [`crate::rouge`]).
//! - **Semantic similarity**: a BERTScore-style F1 over embeddings. Both
//!   texts are split into sentences and embedded; precision is the mean
//!   best cosine match of each candidate sentence among the reference
//!   sentences, recall the converse, and the score is their harmonic mean.
//!
//! The semantic score is `None` when no embedding provider is configured.

use anyhow::{bail, Result};

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::rouge::rouge_scores;

/// Quality of one generated summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScores {
    pub rouge1: f64,
    pub rouge2: f64,
    pub rouge_l: f64,
    pub semantic_f1: Option<f64>,
}

/// Scores a candidate summary against a reference.
pub trait QualityScorer {
    fn score(&self, candidate: &str, reference: &str) -> Result<QualityScores>;
}

/// ROUGE plus, when an embedder is present, the embedding-based F1.
pub struct MetricScorer {
    embedder: Option<Box<dyn EmbeddingProvider>>,
}

impl MetricScorer {
    pub fn new(embedder: Option<Box<dyn EmbeddingProvider>>) -> Self {
        Self { embedder }
    }

    /// ROUGE only.
    pub fn lexical() -> Self {
        Self { embedder: None }
    }

    pub fn embedding_model(&self) -> Option<&str> {
        self.embedder.as_deref().map(|e| e.model_name())
    }
}

impl QualityScorer for MetricScorer {
    fn score(&self, candidate: &str, reference: &str) -> Result<QualityScores> {
        let rouge = rouge_scores(candidate, reference);
        let semantic_f1 = match self.embedder.as_deref() {
            Some(embedder) => Some(semantic_f1(embedder, candidate, reference)?),
            None => None,
        };
        Ok(QualityScores {
            rouge1: rouge.rouge1,
            rouge2: rouge.rouge2,
            rouge_l: rouge.rouge_l,
            semantic_f1,
        })
    }
}

/// Split text into trimmed, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .map(str::to_string)
        .collect()
}

/// Embedding-based F1 between `candidate` and `reference`.
///
/// Returns 0.0 when either side has no sentences.
pub fn semantic_f1(
    embedder: &dyn EmbeddingProvider,
    candidate: &str,
    reference: &str,
) -> Result<f64> {
    let cand = split_sentences(candidate);
    let refr = split_sentences(reference);
    if cand.is_empty() || refr.is_empty() {
        return Ok(0.0);
    }

    let mut texts = cand.clone();
    texts.extend(refr.iter().cloned());
    let vectors = embedder.embed(&texts)?;
    if vectors.len() != texts.len() {
        bail!(
            "embedding provider returned {} vectors for {} inputs",
            vectors.len(),
            texts.len()
        );
    }
    let (cand_vecs, ref_vecs) = vectors.split_at(cand.len());

    Ok(greedy_f1(cand_vecs, ref_vecs))
}

fn best_match_mean(from: &[Vec<f32>], to: &[Vec<f32>]) -> f64 {
    let total: f64 = from
        .iter()
        .map(|a| {
            to.iter()
                .map(|b| cosine_similarity(a, b) as f64)
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .sum();
    total / from.len() as f64
}

fn greedy_f1(candidate: &[Vec<f32>], reference: &[Vec<f32>]) -> f64 {
    let precision = best_match_mean(candidate, reference);
    let recall = best_match_mean(reference, candidate);
    if precision + recall <= 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}
