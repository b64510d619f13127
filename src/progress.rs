//! Extraction and evaluation progress on stderr.
//!
//! `digest extract`, `digest summarize` and `digest evaluate` report which
//! page or model they are working on. Everything goes to stderr; stdout is
//! reserved for command output.

use serde::Serialize;
use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Page `page` of `total` has been extracted.
    Extracting { page: u64, total: u64 },
    /// Model `n` of `total` is about to be evaluated.
    Evaluating { model: String, n: u64, total: u64 },
}

impl ProgressEvent {
    fn human_line(&self) -> String {
        match self {
            ProgressEvent::Extracting { page, total } => {
                format!("extract   page {:>width$} / {}", page, total, width = digits(*total))
            }
            ProgressEvent::Evaluating { model, n, total } => {
                format!("evaluate  [{}/{}] {}", n, total, model)
            }
        }
    }
}

fn digits(n: u64) -> usize {
    n.to_string().len()
}

/// Receives progress events from the extractor and the harness.
pub trait ProgressReporter {
    fn report(&self, event: ProgressEvent);
}

/// Human-readable lines, e.g. `extract   page  3 / 12`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", event.human_line());
        let _ = err.flush();
    }
}

/// One JSON object per line: `{"event":"progress","phase":"extracting",...}`.
pub struct JsonProgress;

#[derive(Serialize)]
struct JsonLine<'a> {
    event: &'static str,
    #[serde(flatten)]
    inner: &'a ProgressEvent,
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let line = JsonLine {
            event: "progress",
            inner: &event,
        };
        if let Ok(text) = serde_json::to_string(&line) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", text);
            let _ = err.flush();
        }
    }
}

/// Discards events.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Value of the `--progress` flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human output when stderr is a terminal, nothing otherwise.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
