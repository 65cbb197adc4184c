//! CSV ingest for lead exports.
//!
//! Rows that fail to parse are reported individually instead of aborting the
//! whole run: lead lists are assembled by hand and a single mangled row
//! should not block the remaining hundreds.

use crate::lead::record::LeadRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    /// 1-based CSV line number (header is line 1).
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed records plus per-row errors.
#[derive(Debug, Clone)]
pub struct IngestedLeads {
    pub records: Vec<LeadRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read a lead CSV into records, collecting row-level errors.
pub fn read_rows(path: &Path) -> Result<IngestedLeads> {
    let file = File::open(path)
        .with_context(|| format!("failed to open input CSV: {}", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read CSV headers: {}", path.display()))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, so data rows begin at line 2.
        let line = idx + 2;
        rows_read += 1;

        let row = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let record = LeadRecord::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), row.get(i).unwrap_or("").to_string())),
        );
        records.push(record);
    }

    Ok(IngestedLeads {
        records,
        row_errors,
        rows_read,
    })
}

/// Strip a UTF-8 BOM from the first header and trim whitespace.
///
/// Excel emits BOM-prefixed CSVs; without this the first column would never
/// match by name.
fn normalize_header(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_string()
}
