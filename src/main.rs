//! # Digest Bench CLI (`digest`)
//!
//! Extracts text from PDFs, summarizes it with local Ollama models, and
//! benchmarks several models against a reference summary.
//!
//! ## Usage
//!
//! ```bash
//! digest --config ./config/digest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `digest extract <pdf>` | Print the extracted text |
//! | `digest summarize <pdf>` | Summarize a document or text file with one model |
//! | `digest evaluate` | Benchmark models and write the result table |
//! | `digest results` | Print a result table |
//! | `digest completions <shell>` | Generate shell completions |
//!
//! Logs go to stderr (`-v` for debug, or `RUST_LOG`); stdout carries only
//! command output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};

use digest_bench::config::{self, Config, SummaryOptions};
use digest_bench::context::RunContext;
use digest_bench::extract::PageTextExtractor;
use digest_bench::harness::ModelOutcome;
use digest_bench::ocr::TesseractOcr;
use digest_bench::pipeline::{self, EvaluationInput, EvaluationRequest};
use digest_bench::progress::{ProgressMode, ProgressReporter};
use digest_bench::report;

/// Digest Bench CLI: PDF summarization and model benchmarking.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist built-in defaults are used. See
/// `config/digest.example.toml` for every setting.
#[derive(Parser)]
#[command(
    name = "digest",
    about = "Digest Bench: summarize PDFs with local models and benchmark them",
    version,
    long_about = "Digest Bench extracts text from PDF documents (with an OCR fallback for \
    image-only pages), summarizes it with models served by a local Ollama instance, and \
    benchmarks models on runtime, memory, throughput, ROUGE, and semantic similarity."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/digest.toml")]
    config: PathBuf,

    /// Verbose logging on stderr (debug level).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Progress reporting on stderr: `off`, `human`, or `json`.
    /// Defaults to `human` when stderr is a terminal.
    #[arg(long, global = true, value_parser = parse_progress)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract the text of a PDF, page by page.
    Extract {
        /// Path to the PDF document.
        pdf: PathBuf,

        /// OCR pages whose structural text is blank.
        #[arg(long)]
        ocr: bool,

        /// Print per-page JSON instead of joined text.
        #[arg(long)]
        json: bool,
    },

    /// Summarize a PDF (or a plain text file) with one model.
    Summarize {
        /// Path to the PDF document.
        #[arg(required_unless_present = "text_file")]
        pdf: Option<PathBuf>,

        /// Summarize the contents of a text file instead of a PDF.
        #[arg(long, conflicts_with = "pdf")]
        text_file: Option<PathBuf>,

        /// Model identifier (overrides `summarize.model`).
        #[arg(long)]
        model: Option<String>,

        /// Approximate summary length (overrides `summarize.max_length`).
        #[arg(long)]
        max_length: Option<u32>,

        /// OCR pages whose structural text is blank.
        #[arg(long)]
        ocr: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Benchmark models on one input and write the result table.
    ///
    /// Without `--text-file` or `--document` the configured default
    /// document is used. Models that fail are skipped; the exit code is
    /// non-zero only when the input document cannot be found.
    Evaluate {
        /// Evaluate the contents of a text file.
        #[arg(long, conflicts_with = "document")]
        text_file: Option<PathBuf>,

        /// Evaluate a PDF document.
        #[arg(long)]
        document: Option<PathBuf>,

        /// Reference summary to score against.
        #[arg(long)]
        reference: Option<String>,

        /// Comma-separated model identifiers (overrides `evaluation.models`).
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,

        /// Result CSV path (overrides `evaluation.results_path`).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Append rows instead of overwriting the result file.
        #[arg(long)]
        append: bool,

        /// OCR pages whose structural text is blank.
        #[arg(long)]
        ocr: bool,
    },

    /// Print a result table.
    Results {
        /// Result CSV path (defaults to `evaluation.results_path`).
        #[arg(long)]
        path: Option<PathBuf>,

        /// Print rows as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("invalid progress mode '{}' (off, human, json)", s))
}

fn init_logging(verbose: u8) {
    let default_level = if verbose > 0 { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "digest", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);
    let cfg = config::load_or_default(&cli.config)?;
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Extract { pdf, ocr, json } => {
            run_extract(&cfg, &pdf, ocr || cfg.extract.ocr_fallback, json, progress.as_ref())?;
        }
        Commands::Summarize {
            pdf,
            text_file,
            model,
            max_length,
            ocr,
            json,
        } => {
            let mut options = SummaryOptions::from_config(&cfg);
            if let Some(model) = model {
                options.model = model;
            }
            if let Some(max_length) = max_length {
                options.max_length = max_length;
            }
            options.ocr_fallback |= ocr;
            options.validate()?;

            let mut ctx = RunContext::from_config(&cfg)?;
            ctx.set_max_length(options.max_length);
            let text = match (pdf, text_file) {
                (_, Some(file)) => read_text_file(&file),
                (Some(pdf), None) => ctx
                    .extractor()
                    .with_progress(progress.as_ref())
                    .extract(&pdf, options.ocr_fallback)
                    .map(|extracted| extracted.joined())
                    .map_err(anyhow::Error::from),
                (None, None) => Err(anyhow::anyhow!("either <PDF> or --text-file is required")),
            };
            let result = text.and_then(|text| run_summarize(&ctx, &options.model, &text, json));
            ctx.shutdown();
            result?;
        }
        Commands::Evaluate {
            text_file,
            document,
            reference,
            models,
            output,
            append,
            ocr,
        } => {
            let mut request = EvaluationRequest::from_config(&cfg);
            if let Some(file) = text_file {
                request.set_text(read_text_file(&file)?);
            } else if let Some(document) = document {
                request.input = EvaluationInput::Document(document);
            }
            request.reference = reference;
            if !models.is_empty() {
                request.models = models;
            }
            if let Some(output) = output {
                request.output = output;
            }
            request.append = append;
            request.ocr_fallback |= ocr;

            let success = run_evaluate(&cfg, &request, progress.as_ref())?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Results { path, json } => {
            let path = path.unwrap_or_else(|| cfg.evaluation.results_path.clone());
            report::run_results(&path, json)?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn read_text_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read text file {}", path.display()))
}

fn run_extract(
    cfg: &Config,
    pdf: &Path,
    ocr_fallback: bool,
    json: bool,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let ocr = TesseractOcr::from_config(&cfg.extract);
    let extracted = PageTextExtractor::new(&ocr)
        .with_progress(progress)
        .extract(pdf, ocr_fallback)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&extracted)?);
    } else {
        println!("{}", extracted.joined());
    }
    Ok(())
}

fn run_summarize(ctx: &RunContext, model: &str, text: &str, json: bool) -> Result<()> {
    let result = ctx.summarizer().summarize(text, model, ctx.max_length())?;

    if json {
        let mut value = serde_json::to_value(&result)?;
        value["model"] = serde_json::json!(model);
        value["summary_words"] = serde_json::json!(result.summary_words());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", result.summary);
    if !result.keywords.is_empty() {
        println!();
        println!("Keywords: {}", result.keywords.join(", "));
    }
    println!();
    println!(
        "{}: {:.2} s, {} tokens, {:.2} tok/s, {} words",
        model,
        result.runtime_sec,
        result.tokens_generated,
        result.speed_tokens_per_sec,
        result.summary_words()
    );
    Ok(())
}

fn run_evaluate(
    cfg: &Config,
    request: &EvaluationRequest,
    progress: &dyn ProgressReporter,
) -> Result<bool> {
    let mut ctx = RunContext::from_config(cfg)?;
    let run = pipeline::run_evaluation(&mut ctx, request, progress);
    ctx.shutdown();
    let run = run?;

    if !run.success {
        eprintln!("Evaluation failed: input document not found.");
        return Ok(false);
    }

    for outcome in &run.report.outcomes {
        match outcome {
            ModelOutcome::Scored(record) => println!(
                "  {:<24} ok       {:>8.2} s  ROUGE1 {:.4}  ROUGEL {:.4}",
                record.model, record.runtime_s, record.rouge1, record.rouge_l
            ),
            ModelOutcome::Failed { model, error } => {
                println!("  {:<24} skipped  {}", model, error)
            }
        }
    }
    println!();
    println!(
        "Wrote {} row(s) to {}",
        run.report.table().len(),
        request.output.display()
    );
    Ok(true)
}
