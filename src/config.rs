use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// 0 disables the request timeout; a hung call then blocks the run.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            timeout_secs: 0,
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Prompt/reply contract used by a deployment. Only one is active per run.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Introduction / key points / conclusion, replied as `SUMMARY:` + `KEYWORDS:`.
    #[default]
    Structured,
    /// Key points + abstract; the raw reply is the summary.
    Plain,
}

impl PromptStyle {
    /// Leading-character budget of the source text embedded in the prompt.
    pub fn default_input_chars(self) -> usize {
        match self {
            PromptStyle::Structured => 10_000,
            PromptStyle::Plain => 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizeConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    #[serde(default)]
    pub prompt: PromptStyle,
    /// Overrides [`PromptStyle::default_input_chars`].
    #[serde(default)]
    pub input_chars: Option<usize>,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_length: default_max_length(),
            prompt: PromptStyle::default(),
            input_chars: None,
        }
    }
}

impl SummarizeConfig {
    pub fn input_chars(&self) -> usize {
        self.input_chars
            .unwrap_or_else(|| self.prompt.default_input_chars())
    }
}

fn default_model() -> String {
    "llama3.2:1b".to_string()
}
fn default_max_length() -> u32 {
    800
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default)]
    pub ocr_fallback: bool,
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: u32,
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: PathBuf,
    #[serde(default = "default_tesseract")]
    pub tesseract: PathBuf,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ocr_fallback: false,
            ocr_dpi: default_ocr_dpi(),
            ocr_language: default_ocr_language(),
            pdftoppm: default_pdftoppm(),
            tesseract: default_tesseract(),
        }
    }
}

fn default_ocr_dpi() -> u32 {
    300
}
fn default_ocr_language() -> String {
    "eng".to_string()
}
fn default_pdftoppm() -> PathBuf {
    PathBuf::from("pdftoppm")
}
fn default_tesseract() -> PathBuf {
    PathBuf::from("tesseract")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvaluationConfig {
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_reference_summary")]
    pub reference_summary: String,
    /// Proxy reference length when raw text is evaluated without a reference.
    #[serde(default = "default_reference_prefix_chars")]
    pub reference_prefix_chars: usize,
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
    #[serde(default = "default_document")]
    pub default_document: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            reference_summary: default_reference_summary(),
            reference_prefix_chars: default_reference_prefix_chars(),
            results_path: default_results_path(),
            default_document: default_document(),
        }
    }
}

fn default_models() -> Vec<String> {
    vec![default_model()]
}
fn default_reference_summary() -> String {
    "This document discusses the challenges of large-scale models and proposes \
     efficient summarization for low-resource devices."
        .to_string()
}
fn default_reference_prefix_chars() -> usize {
    2000
}
fn default_results_path() -> PathBuf {
    PathBuf::from("outputs/evaluation_results.csv")
}
fn default_document() -> PathBuf {
    PathBuf::from("sample_docs/sample1.pdf")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Options recognized for a single summarization request.
///
/// Built at the CLI boundary from flags layered over config defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    pub model: String,
    pub max_length: u32,
    pub ocr_fallback: bool,
}

impl SummaryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.summarize.model.clone(),
            max_length: config.summarize.max_length,
            ocr_fallback: config.extract.ocr_fallback,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            anyhow::bail!("model must not be empty");
        }
        if self.max_length == 0 {
            anyhow::bail!("max_length must be > 0");
        }
        Ok(())
    }
}

/// Load the config file, or the built-in defaults when it does not exist.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate summarize
    if config.summarize.model.trim().is_empty() {
        anyhow::bail!("summarize.model must not be empty");
    }
    if config.summarize.max_length == 0 {
        anyhow::bail!("summarize.max_length must be > 0");
    }
    if config.summarize.input_chars == Some(0) {
        anyhow::bail!("summarize.input_chars must be > 0");
    }

    // Validate extract
    if config.extract.ocr_dpi == 0 {
        anyhow::bail!("extract.ocr_dpi must be > 0");
    }

    // Validate evaluation
    if config.evaluation.models.is_empty() {
        anyhow::bail!("evaluation.models must list at least one model");
    }
    if config.evaluation.models.iter().any(|m| m.trim().is_empty()) {
        anyhow::bail!("evaluation.models must not contain empty identifiers");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, ollama, or local.",
            other
        ),
    }
    if config.embedding.provider == "ollama" && config.embedding.model.is_none() {
        anyhow::bail!("embedding.model must be specified when provider is 'ollama'");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    Ok(())
}
