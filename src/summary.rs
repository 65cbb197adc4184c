//! Aggregate statistics over an annotated lead CSV.
//!
//! Confidence scores are bucketed (high >= 0.8, medium >= 0.6, low >= 0.3,
//! very low below that), flags are tallied per data type, and an overall
//! quality block averages every `_confidence` column in the file.

use crate::lead::{LeadRecord, DECISION_MAKER_SLOTS};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const HIGH_THRESHOLD: f64 = 0.8;
const MEDIUM_THRESHOLD: f64 = 0.6;
const LOW_THRESHOLD: f64 = 0.3;

/// How many of the most frequent flags to keep per data type.
const COMMON_FLAG_LIMIT: usize = 5;

/// The summary document written alongside the annotated CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub timestamp: String,
    pub total_records: usize,
    pub data_types: BTreeMap<String, DataTypeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_quality: Option<OverallQuality>,
}

/// Per-data-type statistics. The bucket fields are omitted for the
/// aggregated decision-makers entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTypeSummary {
    pub records_validated: usize,
    pub average_confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_confidence: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium_confidence: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_confidence: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub very_low_confidence: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_flags: Option<Vec<FlagCount>>,
}

/// One flag with its occurrence count, most frequent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCount {
    pub flag: String,
    pub count: usize,
}

/// Quality metrics across every `_confidence` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallQuality {
    pub average_confidence: f64,
    pub high_quality_percentage: f64,
    pub medium_quality_percentage: f64,
    pub low_quality_percentage: f64,
}

/// Build a summary from annotated records.
pub fn summarize(records: &[LeadRecord]) -> ValidationSummary {
    let mut data_types = BTreeMap::new();

    for data_type in ["revenue", "employee_count"] {
        let confidence_col = format!("{data_type}_confidence");
        let flags_col = format!("{data_type}_flags");

        if !column_present(records, &confidence_col) {
            continue;
        }

        let values = confidences(records, &confidence_col);
        data_types.insert(
            data_type.to_string(),
            DataTypeSummary {
                records_validated: values.len(),
                average_confidence: mean(&values),
                high_confidence: Some(count_in(&values, |c| c >= HIGH_THRESHOLD)),
                medium_confidence: Some(count_in(&values, |c| {
                    (MEDIUM_THRESHOLD..HIGH_THRESHOLD).contains(&c)
                })),
                low_confidence: Some(count_in(&values, |c| {
                    (LOW_THRESHOLD..MEDIUM_THRESHOLD).contains(&c)
                })),
                very_low_confidence: Some(count_in(&values, |c| c < LOW_THRESHOLD)),
                common_flags: Some(common_flags(records, &flags_col)),
            },
        );
    }

    // Decision makers are aggregated across all slots.
    let mut dm_values = Vec::new();
    for n in 1..=DECISION_MAKER_SLOTS {
        dm_values.extend(confidences(records, &format!("decision_maker_{n}_confidence")));
    }
    if !dm_values.is_empty() {
        data_types.insert(
            "decision_makers".to_string(),
            DataTypeSummary {
                records_validated: dm_values.len(),
                average_confidence: mean(&dm_values),
                high_confidence: None,
                medium_confidence: None,
                low_confidence: None,
                very_low_confidence: None,
                common_flags: None,
            },
        );
    }

    ValidationSummary {
        timestamp: Utc::now().to_rfc3339(),
        total_records: records.len(),
        data_types,
        overall_quality: overall_quality(records),
    }
}

/// Write a summary as pretty JSON.
pub fn write_summary(path: &Path, summary: &ValidationSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create summary dir: {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(summary).context("failed to encode summary")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write summary: {}", path.display()))?;
    Ok(())
}

/// Read a summary back from disk.
pub fn read_summary(path: &Path) -> Result<ValidationSummary> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read summary: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid summary JSON: {}", path.display()))
}

fn overall_quality(records: &[LeadRecord]) -> Option<OverallQuality> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for (name, _) in record.fields() {
            if name.ends_with("_confidence") && !columns.iter().any(|c| c == name) {
                columns.push(name.clone());
            }
        }
    }

    let mut all: Vec<f64> = Vec::new();
    for col in &columns {
        all.extend(confidences(records, col));
    }
    if all.is_empty() {
        return None;
    }

    let n = all.len() as f64;
    let pct = |count: usize| count as f64 / n * 100.0;
    Some(OverallQuality {
        average_confidence: mean(&all),
        high_quality_percentage: pct(count_in(&all, |c| c >= HIGH_THRESHOLD)),
        medium_quality_percentage: pct(count_in(&all, |c| {
            (MEDIUM_THRESHOLD..HIGH_THRESHOLD).contains(&c)
        })),
        low_quality_percentage: pct(count_in(&all, |c| c < MEDIUM_THRESHOLD)),
    })
}

fn column_present(records: &[LeadRecord], column: &str) -> bool {
    records.iter().any(|r| r.get(column).is_some())
}

/// Parse every non-empty value of a confidence column.
fn confidences(records: &[LeadRecord], column: &str) -> Vec<f64> {
    records
        .iter()
        .filter_map(|r| r.value(column))
        .filter_map(|v| v.parse::<f64>().ok())
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn count_in(values: &[f64], pred: impl Fn(f64) -> bool) -> usize {
    values.iter().copied().filter(|&c| pred(c)).count()
}

/// Top flags of a JSON-encoded flags column, most frequent first. Ties
/// break alphabetically so the output is stable.
fn common_flags(records: &[LeadRecord], column: &str) -> Vec<FlagCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        let Some(raw) = record.value(column) else {
            continue;
        };
        let Ok(flags) = serde_json::from_str::<Vec<String>>(raw) else {
            continue;
        };
        for flag in flags {
            *counts.entry(flag).or_insert(0) += 1;
        }
    }

    let mut out: Vec<FlagCount> = counts
        .into_iter()
        .map(|(flag, count)| FlagCount { flag, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.flag.cmp(&b.flag)));
    out.truncate(COMMON_FLAG_LIMIT);
    out
}
