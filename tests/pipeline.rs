//! Library-level evaluation runs with injected fakes.
//!
//! Asserts: per-model failures are skipped without failing the run, a
//! missing document is the only failing outcome, results survive a save
//! and tolerant reload, and a deterministic backend gives identical
//! summaries across runs.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use digest_bench::context::RunContext;
use digest_bench::memory::MemoryProbe;
use digest_bench::models::{EvaluationRecord, ResultTable};
use digest_bench::ocr::NoOcr;
use digest_bench::ollama::{GenerateReply, InferenceBackend};
use digest_bench::pipeline::{run_evaluation, EvaluationInput, EvaluationRequest};
use digest_bench::progress::NoProgress;
use digest_bench::scoring::MetricScorer;
use digest_bench::store;
use digest_bench::summarize::{Summarizer, SummarizerSettings};
use tempfile::TempDir;

/// Deterministic backend; models named `*-down` fail.
struct StubBackend {
    prompts: Rc<RefCell<Vec<(String, String)>>>,
}

impl InferenceBackend for StubBackend {
    fn generate(&self, model: &str, prompt: &str) -> Result<GenerateReply> {
        self.prompts
            .borrow_mut()
            .push((model.to_string(), prompt.to_string()));
        if model.ends_with("-down") {
            anyhow::bail!("Ollama connection error (is Ollama running at http://127.0.0.1:9?)");
        }
        Ok(GenerateReply {
            response: format!(
                "SUMMARY: The quick brown fox jumps over the lazy dog, says {model}.\n\
                 KEYWORDS: fox, dog"
            ),
            eval_count: Some(40),
            eval_duration: Some(800_000_000),
        })
    }
}

struct FlatMemory;

impl MemoryProbe for FlatMemory {
    fn used_bytes(&mut self) -> u64 {
        512 * 1024 * 1024
    }
}

fn context(prompts: Rc<RefCell<Vec<(String, String)>>>) -> RunContext {
    RunContext::new(
        Box::new(StubBackend { prompts }),
        Box::new(MetricScorer::lexical()),
        Box::new(FlatMemory),
        Box::new(NoOcr),
        SummarizerSettings::default(),
        200,
    )
}

fn request(input: EvaluationInput, models: &[&str], output: &Path) -> EvaluationRequest {
    EvaluationRequest {
        input,
        reference: None,
        default_reference: "The fox jumps over the dog.".into(),
        reference_prefix_chars: 2000,
        models: models.iter().map(|m| m.to_string()).collect(),
        output: output.to_path_buf(),
        append: false,
        ocr_fallback: false,
    }
}

fn results_path(dir: &TempDir) -> PathBuf {
    dir.path().join("outputs").join("evaluation_results.csv")
}

const SOURCE: &str = "The quick brown fox jumps over the lazy dog. It was a sunny day.";

#[test]
fn failing_model_is_skipped_and_run_succeeds() {
    let dir = TempDir::new().unwrap();
    let output = results_path(&dir);
    let prompts = Rc::new(RefCell::new(vec![]));
    let mut ctx = context(prompts.clone());

    let req = request(
        EvaluationInput::Text(SOURCE.into()),
        &["m1", "m2-down", "m3"],
        &output,
    );
    let run = run_evaluation(&mut ctx, &req, &NoProgress).unwrap();
    ctx.shutdown();

    assert!(run.success);
    let models: Vec<_> = prompts.borrow().iter().map(|(m, _)| m.clone()).collect();
    assert_eq!(models, vec!["m1", "m2-down", "m3"]);
    assert_eq!(run.report.table().models(), vec!["m1", "m3"]);
    assert_eq!(run.report.failures().len(), 1);

    let loaded = store::load(&output).unwrap();
    let stored: Vec<_> = loaded.rows.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(stored, vec!["m1", "m3"]);
    assert_eq!(loaded.rows[0].tokens, Some(40.0));
    assert_eq!(loaded.rows[0].memory_mb, Some(0.0));
    assert_eq!(loaded.rows[0].semantic_f1, None);
}

#[test]
fn every_model_failing_still_succeeds_with_empty_table() {
    let dir = TempDir::new().unwrap();
    let output = results_path(&dir);
    let mut ctx = context(Rc::new(RefCell::new(vec![])));

    let req = request(EvaluationInput::Text(SOURCE.into()), &["a-down", "b-down"], &output);
    let run = run_evaluation(&mut ctx, &req, &NoProgress).unwrap();

    assert!(run.success);
    assert!(run.report.table().is_empty());
    assert!(store::load(&output).unwrap().is_empty());
}

#[test]
fn missing_document_reports_failure_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = results_path(&dir);
    let prompts = Rc::new(RefCell::new(vec![]));
    let mut ctx = context(prompts.clone());

    let req = request(
        EvaluationInput::Document(dir.path().join("sample_docs").join("sample1.pdf")),
        &["m1"],
        &output,
    );
    let run = run_evaluation(&mut ctx, &req, &NoProgress).unwrap();

    assert!(!run.success);
    assert!(prompts.borrow().is_empty());
    assert!(!output.exists());
}

#[test]
fn raw_text_without_reference_scores_against_prefix() {
    let dir = TempDir::new().unwrap();
    let output = results_path(&dir);
    let mut ctx = context(Rc::new(RefCell::new(vec![])));

    let mut req = request(EvaluationInput::Text(SOURCE.into()), &["m1"], &output);
    req.reference_prefix_chars = 44; // "The quick brown fox jumps over the lazy dog."
    let run = run_evaluation(&mut ctx, &req, &NoProgress).unwrap();
    let prefix_scores = run.report.table().rows[0].rouge1;

    req.reference = Some("Completely unrelated words here.".into());
    let run = run_evaluation(&mut ctx, &req, &NoProgress).unwrap();
    let explicit_scores = run.report.table().rows[0].rouge1;

    assert!(prefix_scores > explicit_scores);
}

#[test]
fn identical_inputs_give_identical_summaries() {
    let dir = TempDir::new().unwrap();
    let output = results_path(&dir);
    let mut ctx = context(Rc::new(RefCell::new(vec![])));
    let req = request(EvaluationInput::Text(SOURCE.into()), &["m1", "m3"], &output);

    let first = run_evaluation(&mut ctx, &req, &NoProgress).unwrap().report.table();
    let second = run_evaluation(&mut ctx, &req, &NoProgress).unwrap().report.table();

    let summaries = |t: &ResultTable| t.rows.iter().map(|r| r.summary.clone()).collect::<Vec<_>>();
    assert_eq!(summaries(&first), summaries(&second));
    assert_eq!(
        first.rows[0].summary,
        "The quick brown fox jumps over the lazy dog, says m1."
    );
}

#[test]
fn repeated_summaries_match_text_and_keywords() {
    let backend = StubBackend {
        prompts: Rc::new(RefCell::new(vec![])),
    };
    let summarizer = Summarizer::new(&backend, SummarizerSettings::default());

    let first = summarizer.summarize(SOURCE, "m1", 200).unwrap();
    let second = summarizer.summarize(SOURCE, "m1", 200).unwrap();

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.keywords, second.keywords);
    assert_eq!(first.keywords, vec!["fox", "dog"]);
    assert_eq!(backend.prompts.borrow()[0], backend.prompts.borrow()[1]);
}

#[test]
fn append_mode_accumulates_rows_under_one_header() {
    let dir = TempDir::new().unwrap();
    let output = results_path(&dir);
    let mut ctx = context(Rc::new(RefCell::new(vec![])));
    let mut req = request(EvaluationInput::Text(SOURCE.into()), &["m1"], &output);
    req.append = true;

    run_evaluation(&mut ctx, &req, &NoProgress).unwrap();
    run_evaluation(&mut ctx, &req, &NoProgress).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content.matches("BERTScore_F1").count(), 1);
    assert_eq!(store::load(&output).unwrap().len(), 2);
}

fn record(model: &str, runtime_s: f64, semantic_f1: Option<f64>) -> EvaluationRecord {
    EvaluationRecord {
        model: model.into(),
        runtime_s,
        tokens: 123,
        memory_mb: -3.25,
        rouge1: 0.5,
        rouge2: 0.125,
        rouge_l: 0.4,
        semantic_f1,
        summary: "A summary, with a comma\nand a newline.".into(),
    }
}

#[test]
fn round_trip_survives_stray_header_row() {
    let dir = TempDir::new().unwrap();
    let output = results_path(&dir);
    let table = ResultTable {
        rows: vec![record("m1", 1.23, Some(0.875)), record("m3", 4.56, None)],
    };
    store::save(&output, &table).unwrap();

    // a second save appended the header again, followed by another row
    let mut content = std::fs::read_to_string(&output).unwrap();
    content.push_str("model,runtime_s,tokens,memory_MB,ROUGE1,ROUGE2,ROUGEL,BERTScore_F1,summary\n");
    std::fs::write(&output, content).unwrap();

    let loaded = store::load(&output).unwrap();
    assert_eq!(loaded.len(), table.len());
    for (stored, original) in loaded.rows.iter().zip(&table.rows) {
        assert_eq!(stored.model, original.model);
        assert_eq!(stored.runtime_s, Some(original.runtime_s));
        assert_eq!(stored.tokens, Some(original.tokens as f64));
        assert_eq!(stored.memory_mb, Some(original.memory_mb));
        assert_eq!(stored.rouge1, Some(original.rouge1));
        assert_eq!(stored.rouge2, Some(original.rouge2));
        assert_eq!(stored.rouge_l, Some(original.rouge_l));
        assert_eq!(stored.semantic_f1, original.semantic_f1);
        assert_eq!(stored.summary, original.summary);
    }
}
