//! ROUGE n-gram overlap scores.
//!
//! Implements the F-measure of ROUGE-1 (unigrams), ROUGE-2 (bigrams), and
//! ROUGE-L (longest common subsequence) between a candidate summary and a
//! reference. Tokenization follows the reference `rouge_score` package
//! without stemming: lowercase, every run of characters outside `[a-z0-9]`
//! is a separator.

use std::collections::HashMap;

/// F-measures in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RougeScores {
    pub rouge1: f64,
    pub rouge2: f64,
    pub rouge_l: f64,
}

/// Score `candidate` against `reference`.
pub fn rouge_scores(candidate: &str, reference: &str) -> RougeScores {
    let cand = tokenize(candidate);
    let refr = tokenize(reference);
    RougeScores {
        rouge1: ngram_f1(&cand, &refr, 1),
        rouge2: ngram_f1(&cand, &refr, 2),
        rouge_l: lcs_f1(&cand, &refr),
    }
}

/// Lowercased ASCII alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

fn ngram_f1(candidate: &[String], reference: &[String], n: usize) -> f64 {
    let cand = ngram_counts(candidate, n);
    let refr = ngram_counts(reference, n);
    let cand_total: usize = cand.values().sum();
    let ref_total: usize = refr.values().sum();

    let overlap: usize = cand
        .iter()
        .map(|(gram, &count)| count.min(refr.get(gram).copied().unwrap_or(0)))
        .sum();

    f_measure(overlap, cand_total, ref_total)
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Two rolling rows of the LCS table.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn lcs_f1(candidate: &[String], reference: &[String]) -> f64 {
    f_measure(
        lcs_len(candidate, reference),
        candidate.len(),
        reference.len(),
    )
}

fn f_measure(overlap: usize, candidate_total: usize, reference_total: usize) -> f64 {
    if overlap == 0 || candidate_total == 0 || reference_total == 0 {
        return 0.0;
    }
    let precision = overlap as f64 / candidate_total as f64;
    let recall = overlap as f64 / reference_total as f64;
    2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_texts_score_one() {
        let s = rouge_scores("The cat sat on the mat.", "the cat sat on the mat");
        assert!(close(s.rouge1, 1.0));
        assert!(close(s.rouge2, 1.0));
        assert!(close(s.rouge_l, 1.0));
    }

    #[test]
    fn disjoint_texts_score_zero() {
        let s = rouge_scores("alpha beta", "gamma delta");
        assert_eq!(s, RougeScores { rouge1: 0.0, rouge2: 0.0, rouge_l: 0.0 });
    }

    #[test]
    fn partial_overlap() {
        // candidate: the cat was found under the bed (7)
        // reference: the cat was under the bed (6)
        let s = rouge_scores(
            "the cat was found under the bed",
            "the cat was under the bed",
        );
        // unigram overlap 6 -> P=6/7 R=1
        assert!(close(s.rouge1, 2.0 * (6.0 / 7.0) / (6.0 / 7.0 + 1.0)));
        // bigrams: cand 6, ref 5, overlap 4 (the cat, cat was, under the, the bed)
        let (p, r) = (4.0 / 6.0, 4.0 / 5.0);
        assert!(close(s.rouge2, 2.0 * p * r / (p + r)));
        // LCS = 6
        assert!(close(s.rouge_l, s.rouge1));
    }

    #[test]
    fn lcs_is_order_sensitive() {
        let s = rouge_scores("c b a", "a b c");
        assert!(close(s.rouge1, 1.0));
        assert!(close(s.rouge_l, 1.0 / 3.0));
    }

    #[test]
    fn empty_inputs_score_zero() {
        let s = rouge_scores("", "reference text");
        assert_eq!(s.rouge1, 0.0);
        let s = rouge_scores("candidate", "  ...  ");
        assert_eq!(s.rouge_l, 0.0);
    }

    #[test]
    fn tokenizer_drops_punctuation_and_case() {
        assert_eq!(
            tokenize("Hello, World! GPU-4 naïve"),
            vec!["hello", "world", "gpu", "4", "na", "ve"]
        );
    }
}
