//! Summarization of extracted text through an inference backend.
//!
//! [`Summarizer::summarize`] truncates the input to a leading-character
//! budget, builds one prompt, performs a single timed round-trip to the
//! backend, parses the reply, and derives throughput.
//!
//! # Reply contract
//!
//! With [`PromptStyle::Structured`] the model is asked to answer with two
//! literal sections:
//!
//! ```text
//! SUMMARY: <structured summary text>
//! KEYWORDS: <keyword1, keyword2>
//! ```
//!
//! [`parse_reply`] reads that with a small state machine. Replies that do
//! not carry both markers in that order fall back to the whole trimmed reply
//! as the summary with no keywords ([`ReplyStructure::Degraded`]).
//!
//! With [`PromptStyle::Plain`] the reply is never parsed: the trimmed raw
//! text is the summary.
//!
//! # Throughput
//!
//! Speed prefers the service-reported generation time (`eval_duration`, in
//! nanoseconds) and falls back to the wall-clock runtime of the call; see
//! [`tokens_per_second`].

use std::time::Instant;

use crate::config::{PromptStyle, SummarizeConfig};
use crate::error::PipelineError;
use crate::models::SummaryResult;
use crate::ollama::InferenceBackend;

pub const SUMMARY_TAG: &str = "SUMMARY:";
pub const KEYWORDS_TAG: &str = "KEYWORDS:";

/// Prompt style and input budget for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizerSettings {
    pub style: PromptStyle,
    /// Leading characters of the source text embedded in the prompt.
    pub input_chars: usize,
}

impl SummarizerSettings {
    pub fn from_config(config: &SummarizeConfig) -> Self {
        Self {
            style: config.prompt,
            input_chars: config.input_chars(),
        }
    }
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self::from_config(&SummarizeConfig::default())
    }
}

/// Summarizes text with one backend call per request.
pub struct Summarizer<'a> {
    backend: &'a dyn InferenceBackend,
    settings: SummarizerSettings,
}

impl<'a> Summarizer<'a> {
    pub fn new(backend: &'a dyn InferenceBackend, settings: SummarizerSettings) -> Self {
        Self { backend, settings }
    }

    /// Summarize `text` with `model`, targeting roughly `max_length` tokens.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyInput`] for blank text; the backend is not called.
    /// - [`PipelineError::ModelInvocation`] when the backend call fails.
    pub fn summarize(
        &self,
        text: &str,
        model: &str,
        max_length: u32,
    ) -> Result<SummaryResult, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let excerpt = truncate_chars(text, self.settings.input_chars);
        let prompt = build_prompt(self.settings.style, excerpt, max_length);

        let started = Instant::now();
        let reply = self
            .backend
            .generate(model, &prompt)
            .map_err(|source| PipelineError::ModelInvocation {
                model: model.to_string(),
                source,
            })?;
        let runtime = started.elapsed().as_secs_f64();

        let parsed = match self.settings.style {
            PromptStyle::Structured => parse_reply(&reply.response),
            PromptStyle::Plain => ParsedReply::whole(&reply.response),
        };
        if self.settings.style == PromptStyle::Structured
            && parsed.structure == ReplyStructure::Degraded
        {
            tracing::warn!(model, "reply lacks SUMMARY/KEYWORDS sections, using it verbatim");
        }

        let eval_count = reply.eval_count.unwrap_or(0);
        let eval_duration = reply.eval_duration.unwrap_or(0);
        let speed = tokens_per_second(eval_count, eval_duration, runtime);

        tracing::debug!(
            model,
            runtime_sec = runtime,
            tokens = eval_count,
            tokens_per_sec = speed,
            "summary generated"
        );

        Ok(SummaryResult {
            summary: parsed.summary,
            keywords: parsed.keywords,
            runtime_sec: round2(runtime),
            tokens_generated: eval_count,
            speed_tokens_per_sec: round2(speed),
        })
    }
}

/// The first `max_chars` characters of `text` (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Build the single prompt sent to the model.
pub fn build_prompt(style: PromptStyle, excerpt: &str, max_length: u32) -> String {
    match style {
        PromptStyle::Structured => format!(
            "You are an expert technical writer.\n\
             1. Provide a comprehensive summary of the following document.\n\
             2. Structure your summary with the following sections:\n\
             \x20  - **Introduction**: Brief overview of the document's purpose.\n\
             \x20  - **Key Points**: Bulleted list of the most important findings or arguments (at least 5 points).\n\
             \x20  - **Conclusion**: A final wrapping thought or implication.\n\
             3. Keep the summary to approximately {max_length} tokens while covering all details.\n\
             4. Extract exactly 2 key topics or keywords, separated by commas.\n\
             \n\
             Format your response exactly like this:\n\
             {SUMMARY_TAG} <structured summary text>\n\
             {KEYWORDS_TAG} <keyword1, keyword2>\n\
             \n\
             Text:\n\
             {excerpt}\n"
        ),
        PromptStyle::Plain => format!(
            "Summarize the following document into key points and a concise abstract \
             (max {max_length} tokens).\n\
             Focus on domain-specific terminology and factual accuracy.\n\
             \n\
             Text:\n\
             {excerpt}\n"
        ),
    }
}

/// Whether a reply carried the expected sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStructure {
    /// Both markers found, `SUMMARY:` before `KEYWORDS:`.
    Structured,
    /// Markers missing or out of order; the whole reply is the summary.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub summary: String,
    pub keywords: Vec<String>,
    pub structure: ReplyStructure,
}

impl ParsedReply {
    fn whole(raw: &str) -> Self {
        Self {
            summary: raw.trim().to_string(),
            keywords: Vec::new(),
            structure: ReplyStructure::Degraded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    BeforeSummary,
    InSummary,
    InKeywords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Summary,
    Keywords,
}

impl Marker {
    fn tag(self) -> &'static str {
        match self {
            Marker::Summary => SUMMARY_TAG,
            Marker::Keywords => KEYWORDS_TAG,
        }
    }
}

/// Earliest marker in `text`. Inside the keyword section only a second
/// `KEYWORDS:` counts as a marker.
fn next_marker(text: &str, state: ParseState) -> Option<(usize, Marker)> {
    let keywords = text.find(KEYWORDS_TAG).map(|i| (i, Marker::Keywords));
    if state == ParseState::InKeywords {
        return keywords;
    }
    let summary = text.find(SUMMARY_TAG).map(|i| (i, Marker::Summary));
    match (summary, keywords) {
        (Some(s), Some(k)) => Some(if s.0 < k.0 { s } else { k }),
        (s, k) => s.or(k),
    }
}

/// Parse a `SUMMARY:` / `KEYWORDS:` reply.
///
/// The summary is everything before the first `KEYWORDS:` with every
/// `SUMMARY:` tag removed, trimmed. Keywords are the comma-separated,
/// trimmed, non-empty tokens between the first `KEYWORDS:` and the next one
/// (or the end of the reply).
///
/// A `KEYWORDS:` that appears before any `SUMMARY:` is deliberately
/// degraded: the whole trimmed reply becomes the summary.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let mut state = ParseState::BeforeSummary;
    let mut summary = String::new();
    let mut keywords = String::new();
    let mut rest = raw;

    loop {
        let Some((at, marker)) = next_marker(rest, state) else {
            match state {
                ParseState::InKeywords => keywords.push_str(rest),
                _ => summary.push_str(rest),
            }
            break;
        };
        let (segment, after) = (&rest[..at], &rest[at + marker.tag().len()..]);

        match (state, marker) {
            (ParseState::BeforeSummary, Marker::Summary) => {
                summary.push_str(segment);
                state = ParseState::InSummary;
            }
            // Keywords ahead of any summary section.
            (ParseState::BeforeSummary, Marker::Keywords) => return ParsedReply::whole(raw),
            (ParseState::InSummary, Marker::Summary) => summary.push_str(segment),
            (ParseState::InSummary, Marker::Keywords) => {
                summary.push_str(segment);
                state = ParseState::InKeywords;
            }
            (ParseState::InKeywords, _) => {
                keywords.push_str(segment);
                break;
            }
        }
        rest = after;
    }

    if state != ParseState::InKeywords {
        return ParsedReply::whole(raw);
    }

    ParsedReply {
        summary: summary.trim().to_string(),
        keywords: keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        structure: ReplyStructure::Structured,
    }
}

/// Generated tokens per second.
///
/// Uses `eval_duration` (ns) when positive, else the wall-clock `runtime`
/// (s) when positive, else 0.
pub fn tokens_per_second(eval_count: u64, eval_duration_ns: u64, runtime_secs: f64) -> f64 {
    if eval_duration_ns > 0 {
        eval_count as f64 / (eval_duration_ns as f64 / 1e9)
    } else if runtime_secs > 0.0 {
        eval_count as f64 / runtime_secs
    } else {
        0.0
    }
}

/// Round to two decimals for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
