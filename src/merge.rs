//! Join validation columns back onto an original lead export.
//!
//! A left join on business name: every original row is kept, matched rows
//! receive the `_confidence`, `_explanation` and `_flags` columns from the
//! annotated file, unmatched rows get empty cells for them.

use crate::lead::{self, LeadRecord};
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a merge run.
#[derive(Debug)]
pub struct MergeOutcome {
    pub rows: usize,
    pub matched: usize,
}

/// Merge annotation columns from `validated` onto `original`, writing the
/// joined rows to `output`.
pub fn merge_files(original: &Path, validated: &Path, output: &Path) -> Result<MergeOutcome> {
    let original_rows = lead::read_rows(original)?.records;
    let validated_rows = lead::read_rows(validated)?.records;

    let columns = annotation_columns(&validated_rows);
    if columns.is_empty() {
        warn!("validated file carries no annotation columns");
    }

    let by_name: HashMap<String, &LeadRecord> = validated_rows
        .iter()
        .filter_map(|r| r.business_name().map(|n| (n.to_lowercase(), r)))
        .collect();

    let mut matched = 0usize;
    let mut merged = Vec::with_capacity(original_rows.len());
    for mut row in original_rows {
        let hit = row
            .business_name()
            .and_then(|n| by_name.get(&n.to_lowercase()).copied());
        if hit.is_some() {
            matched += 1;
        }
        for col in &columns {
            let value = hit.and_then(|v| v.get(col)).unwrap_or("");
            row.set(col, value);
        }
        merged.push(row);
    }

    lead::write_rows(output, &merged)?;
    info!(rows = merged.len(), matched, "merge written");
    Ok(MergeOutcome {
        rows: merged.len(),
        matched,
    })
}

/// Annotation columns present in the validated rows, in first-seen order.
fn annotation_columns(rows: &[LeadRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for (name, _) in row.fields() {
            let is_annotation = name.ends_with("_confidence")
                || name.ends_with("_explanation")
                || name.ends_with("_flags")
                || name == "validation_error";
            if is_annotation && !columns.iter().any(|c| c == name) {
                columns.push(name.clone());
            }
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_left_join_by_business_name() {
        let dir = tempfile::tempdir().unwrap();
        let original = write_csv(
            dir.path(),
            "original.csv",
            "Business Name,Industry\nAcme Corp,Manufacturing\nBeta LLC,Retail\n",
        );
        let validated = write_csv(
            dir.path(),
            "validated.csv",
            "Business Name,revenue_confidence,revenue_flags\nacme corp,0.85,[]\n",
        );
        let output = dir.path().join("merged.csv");

        let outcome = merge_files(&original, &validated, &output).unwrap();
        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.matched, 1);

        let rows = lead::read_rows(&output).unwrap().records;
        // Match is case-insensitive.
        assert_eq!(rows[0].get("revenue_confidence"), Some("0.85"));
        assert_eq!(rows[0].get("Industry"), Some("Manufacturing"));
        // Unmatched rows keep the column with an empty cell.
        assert_eq!(rows[1].get("revenue_confidence"), Some(""));
    }

    #[test]
    fn test_non_annotation_columns_not_copied() {
        let dir = tempfile::tempdir().unwrap();
        let original = write_csv(
            dir.path(),
            "original.csv",
            "Company,Industry\nAcme Corp,Manufacturing\n",
        );
        let validated = write_csv(
            dir.path(),
            "validated.csv",
            "Business Name,estimated_revenue,revenue_explanation\nAcme Corp,$9.9M,fine\n",
        );
        let output = dir.path().join("merged.csv");

        merge_files(&original, &validated, &output).unwrap();
        let rows = lead::read_rows(&output).unwrap().records;
        assert_eq!(rows[0].get("revenue_explanation"), Some("fine"));
        // The validated file's own data columns stay out of the merge.
        assert_eq!(rows[0].get("estimated_revenue"), None);
    }
}
