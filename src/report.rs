//! Benchmark table overview.
//!
//! Reads a persisted result table (tolerantly, see [`crate::store::load`])
//! and prints one line per model. Used by `digest results`.

use anyhow::Result;
use std::path::Path;

use crate::store::{self, LoadedTable};

/// Run the results command: load the table and print it.
pub fn run_results(path: &Path, json: bool) -> Result<()> {
    let table = store::load(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&table.rows)?);
        return Ok(());
    }

    println!("Digest Bench: Evaluation Results");
    println!("================================");
    println!();
    println!("  File:    {}", path.display());
    println!("  Rows:    {}", table.len());
    println!();
    print!("{}", render_table(&table));
    println!();
    Ok(())
}

/// Fixed-width rows: model, runtime_s, memory_MB, ROUGE1, ROUGEL,
/// BERTScore_F1. Missing values print as `-`.
pub fn render_table(table: &LoadedTable) -> String {
    let mut out = String::new();
    if table.is_empty() {
        out.push_str("  No results.\n");
        return out;
    }

    out.push_str(&format!(
        "  {:<24} {:>10} {:>10} {:>8} {:>8} {:>13}\n",
        "MODEL", "RUNTIME_S", "MEMORY_MB", "ROUGE1", "ROUGEL", "BERTSCORE_F1"
    ));
    out.push_str(&format!("  {}\n", "-".repeat(78)));
    for row in &table.rows {
        out.push_str(&format!(
            "  {:<24} {:>10} {:>10} {:>8} {:>8} {:>13}\n",
            row.model,
            format_cell(row.runtime_s, 2),
            format_cell(row.memory_mb, 2),
            format_cell(row.rouge1, 4),
            format_cell(row.rouge_l, 4),
            format_cell(row.semantic_f1, 4),
        ));
    }
    out
}

fn format_cell(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}
