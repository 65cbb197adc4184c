//! Annotated CSV output.
//!
//! The writer rewrites the whole result set on every flush; the column set
//! is the union of all columns across rows, in first-seen order, so late
//! annotation columns (added only for some leads) still line up.

use crate::lead::record::LeadRecord;
use anyhow::{Context, Result};
use std::path::Path;

/// Write records to `path`, creating parent directories as needed.
///
/// An empty slice still produces a valid (headerless) file so that resumed
/// runs can distinguish "started, nothing done" from "never started".
pub fn write_rows(path: &Path, rows: &[LeadRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
        }
    }

    let columns = column_union(rows);

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open output CSV: {}", path.display()))?;

    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }
    for row in rows {
        let values: Vec<&str> = columns
            .iter()
            .map(|col| row.get(col).unwrap_or(""))
            .collect();
        writer.write_record(&values)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush output CSV: {}", path.display()))?;

    Ok(())
}

/// Union of all column names across rows, in first-seen order.
fn column_union(rows: &[LeadRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for (name, _) in row.fields() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.clone());
            }
        }
    }
    columns
}
