//! Result table persistence (CSV).
//!
//! Columns follow [`RESULT_COLUMNS`]. A missing semantic score is written
//! as an empty cell.
//!
//! Loading is tolerant, since the same file may be appended to across runs
//! and hand-edited: rows whose `model` cell is the literal `"model"` (a
//! re-saved header) are dropped, rows may have missing trailing cells, and
//! every numeric column is coerced to `Option<f64>` with unparsable values
//! mapped to `None`.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{ResultTable, RESULT_COLUMNS};

/// Write `table` to `path`, replacing any previous content.
pub fn save(path: &Path, table: &ResultTable) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows(&mut wtr, table)?;
    if table.is_empty() {
        // serde only emits the header alongside the first record
        wtr.write_record(RESULT_COLUMNS)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Append `table` to `path`. The header is written only when the file is
/// new or empty.
pub fn append(path: &Path, table: &ResultTable) -> Result<()> {
    ensure_parent(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let fresh = file.metadata()?.len() == 0;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(fresh)
        .from_writer(file);
    write_rows(&mut wtr, table)?;
    if fresh && table.is_empty() {
        wtr.write_record(RESULT_COLUMNS)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_rows<W: std::io::Write>(wtr: &mut csv::Writer<W>, table: &ResultTable) -> Result<()> {
    for row in &table.rows {
        wtr.serialize(row)?;
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// One row as read back from disk, numerics coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub model: String,
    pub runtime_s: Option<f64>,
    pub tokens: Option<f64>,
    #[serde(rename = "memory_MB")]
    pub memory_mb: Option<f64>,
    #[serde(rename = "ROUGE1")]
    pub rouge1: Option<f64>,
    #[serde(rename = "ROUGE2")]
    pub rouge2: Option<f64>,
    #[serde(rename = "ROUGEL")]
    pub rouge_l: Option<f64>,
    #[serde(rename = "BERTScore_F1")]
    pub semantic_f1: Option<f64>,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadedTable {
    pub rows: Vec<StoredRow>,
}

impl LoadedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load a result table written by [`save`] or [`append`].
pub fn load(path: &Path) -> Result<LoadedTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open results file {}", path.display()))?;

    let columns: HashMap<String, usize> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_string(), i))
        .collect();

    let mut table = LoadedTable::default();
    for record in rdr.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        let cell = |name: &str| field(&record, &columns, name);
        let model = cell("model").trim();
        if model == "model" {
            continue;
        }

        table.rows.push(StoredRow {
            model: model.to_string(),
            runtime_s: coerce(cell("runtime_s")),
            tokens: coerce(cell("tokens")),
            memory_mb: coerce(cell("memory_MB")),
            rouge1: coerce(cell("ROUGE1")),
            rouge2: coerce(cell("ROUGE2")),
            rouge_l: coerce(cell("ROUGEL")),
            semantic_f1: coerce(cell("BERTScore_F1")),
            summary: cell("summary").to_string(),
        });
    }

    Ok(table)
}

fn field<'r>(
    record: &'r csv::StringRecord,
    columns: &HashMap<String, usize>,
    name: &str,
) -> &'r str {
    columns
        .get(name)
        .and_then(|&i| record.get(i))
        .unwrap_or("")
}

/// Numeric cell to `Some(value)`, anything else to `None`.
fn coerce(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
