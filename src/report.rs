//! Static HTML report over an annotated lead CSV.
//!
//! Self-contained single file: overview cards, a confidence distribution
//! table, per-data-type sections with common flags, a sample of the first
//! ten rows, and recommendations for data types with weak confidence.

use crate::lead::LeadRecord;
use crate::summary::ValidationSummary;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Sample rows shown in the report.
const SAMPLE_ROWS: usize = 10;

/// Validation columns shown in the sample table.
const SAMPLE_VALIDATION_COLUMNS: usize = 6;

/// Data types whose mean confidence falls below this get a manual-review
/// recommendation.
const REVIEW_THRESHOLD: f64 = 0.6;

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 0; padding: 20px; color: #333; }
h1, h2, h3 { color: #2c3e50; }
.container { max-width: 1200px; margin: 0 auto; }
.card { background: white; border-radius: 5px; box-shadow: 0 2px 5px rgba(0,0,0,0.1); margin-bottom: 20px; padding: 20px; }
table { width: 100%; border-collapse: collapse; }
th, td { padding: 8px; text-align: left; border-bottom: 1px solid #ddd; }
th { background-color: #f2f2f2; }
.summary { display: flex; flex-wrap: wrap; gap: 20px; }
.summary-card { flex: 1; min-width: 250px; background: #f8f9fa; padding: 15px; border-radius: 5px; }
.confidence-high { color: green; }
.confidence-medium { color: orange; }
.confidence-low { color: red; }
"#;

/// Render the report to an HTML string.
pub fn render_report(records: &[LeadRecord], summary: Option<&ValidationSummary>) -> String {
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n\
         <title>Data Validation Report</title>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <style>{STYLE}</style>\n</head>\n<body>\n<div class=\"container\">\n\
         <h1>Data Validation Report</h1>\n\
         <p>Generated on {}</p>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    );

    render_overview(&mut html, records, summary);
    render_distribution(&mut html, records);
    if let Some(summary) = summary {
        render_data_types(&mut html, summary);
    }
    render_sample(&mut html, records);
    render_recommendations(&mut html, records);

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

/// Render and write the report file.
pub fn write_report(
    path: &Path,
    records: &[LeadRecord],
    summary: Option<&ValidationSummary>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create report dir: {}", parent.display()))?;
        }
    }
    fs::write(path, render_report(records, summary))
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    Ok(())
}

fn render_overview(html: &mut String, records: &[LeadRecord], summary: Option<&ValidationSummary>) {
    let _ = write!(
        html,
        "<div class=\"card\">\n<h2>Overview</h2>\n<div class=\"summary\">\n\
         <div class=\"summary-card\">\n<h3>Records</h3>\n\
         <p><strong>Total records:</strong> {}</p>\n</div>\n",
        records.len()
    );

    if let Some(quality) = summary.and_then(|s| s.overall_quality.as_ref()) {
        let _ = write!(
            html,
            "<div class=\"summary-card\">\n<h3>Overall Quality</h3>\n\
             <p><strong>Average confidence:</strong> <span class=\"{}\">{:.2}</span></p>\n\
             <p><strong>High quality data:</strong> {:.1}%</p>\n\
             <p><strong>Medium quality data:</strong> {:.1}%</p>\n\
             <p><strong>Low quality data:</strong> {:.1}%</p>\n</div>\n",
            confidence_class(quality.average_confidence),
            quality.average_confidence,
            quality.high_quality_percentage,
            quality.medium_quality_percentage,
            quality.low_quality_percentage,
        );
    }

    html.push_str("</div>\n</div>\n");
}

/// Confidence distribution across every `_confidence` column, as a table.
fn render_distribution(html: &mut String, records: &[LeadRecord]) {
    let values = all_confidences(records);
    if values.is_empty() {
        return;
    }

    let bucket = |lo: f64, hi: f64| values.iter().filter(|&&c| c >= lo && c < hi).count();
    let high = values.iter().filter(|&&c| c >= 0.8).count();

    let _ = write!(
        html,
        "<div class=\"card\">\n<h2>Confidence Distribution</h2>\n<table>\n\
         <thead><tr><th>Bucket</th><th>Count</th></tr></thead>\n<tbody>\n\
         <tr><td>High (&ge; 0.8)</td><td>{high}</td></tr>\n\
         <tr><td>Medium (0.6 &ndash; 0.8)</td><td>{}</td></tr>\n\
         <tr><td>Low (0.3 &ndash; 0.6)</td><td>{}</td></tr>\n\
         <tr><td>Very low (&lt; 0.3)</td><td>{}</td></tr>\n\
         </tbody>\n</table>\n</div>\n",
        bucket(0.6, 0.8),
        bucket(0.3, 0.6),
        bucket(0.0, 0.3),
    );
}

fn render_data_types(html: &mut String, summary: &ValidationSummary) {
    for (data_type, data) in &summary.data_types {
        let _ = write!(
            html,
            "<div class=\"card\">\n<h2>{} Validation</h2>\n\
             <p><strong>Records validated:</strong> {}</p>\n\
             <p><strong>Average confidence:</strong> {:.2}</p>\n",
            title_case(data_type),
            data.records_validated,
            data.average_confidence,
        );

        if let Some(flags) = &data.common_flags {
            html.push_str("<h3>Common Flags</h3>\n<ul>\n");
            for fc in flags {
                let _ = write!(
                    html,
                    "<li>{} ({} occurrences)</li>\n",
                    escape(&fc.flag),
                    fc.count
                );
            }
            html.push_str("</ul>\n");
        }

        html.push_str("</div>\n");
    }
}

fn render_sample(html: &mut String, records: &[LeadRecord]) {
    let columns = sample_columns(records);
    if columns.is_empty() {
        return;
    }

    html.push_str(
        "<div class=\"card\">\n<h2>Sample Data</h2>\n<div style=\"overflow-x: auto;\">\n\
         <table>\n<thead>\n<tr>",
    );
    for col in &columns {
        let _ = write!(html, "<th>{}</th>", escape(col));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for record in records.iter().take(SAMPLE_ROWS) {
        html.push_str("<tr>");
        for col in &columns {
            let value = record.get(col).unwrap_or("");
            if col.ends_with("_confidence") {
                match value.parse::<f64>() {
                    Ok(conf) => {
                        let _ = write!(
                            html,
                            "<td><span class=\"{}\">{conf:.2}</span></td>",
                            confidence_class(conf)
                        );
                    }
                    Err(_) => html.push_str("<td></td>"),
                }
            } else {
                let _ = write!(html, "<td>{}</td>", escape(value));
            }
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n</div>\n</div>\n");
}

fn render_recommendations(html: &mut String, records: &[LeadRecord]) {
    html.push_str("<div class=\"card\">\n<h2>Recommendations</h2>\n<ul>\n");

    let weak = weak_data_types(records);
    if !weak.is_empty() {
        let _ = write!(
            html,
            "<li><strong>Verify low confidence data:</strong> The following data types \
             have low average confidence and should be manually verified: {}</li>\n",
            escape(&weak.join(", "))
        );
    }

    html.push_str(
        "<li><strong>Address common flags:</strong> Review and address the most common \
         flags identified in the validation process.</li>\n\
         <li><strong>Enhance data collection:</strong> Consider improving data collection \
         methods for types with consistently low confidence scores.</li>\n\
         </ul>\n</div>\n",
    );
}

/// Lead name columns plus the first few validation columns.
fn sample_columns(records: &[LeadRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut validation = 0usize;
    for record in records {
        for (name, _) in record.fields() {
            if columns.iter().any(|c| c == name) {
                continue;
            }
            if name == "Business Name" || name == "Company" {
                columns.push(name.clone());
            } else if (name.ends_with("_confidence") || name.ends_with("_flags"))
                && validation < SAMPLE_VALIDATION_COLUMNS
            {
                columns.push(name.clone());
                validation += 1;
            }
        }
    }
    columns
}

/// Data types whose mean confidence is below the review threshold.
fn weak_data_types(records: &[LeadRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for (name, _) in record.fields() {
            if name.ends_with("_confidence") && !columns.iter().any(|c| c == name) {
                columns.push(name.clone());
            }
        }
    }

    let mut weak = Vec::new();
    for col in columns {
        let values: Vec<f64> = records
            .iter()
            .filter_map(|r| r.value(&col))
            .filter_map(|v| v.parse::<f64>().ok())
            .collect();
        if values.is_empty() {
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if mean < REVIEW_THRESHOLD {
            weak.push(col.trim_end_matches("_confidence").to_string());
        }
    }
    weak
}

fn all_confidences(records: &[LeadRecord]) -> Vec<f64> {
    let mut out = Vec::new();
    for record in records {
        for (name, value) in record.fields() {
            if name.ends_with("_confidence") {
                if let Ok(conf) = value.parse::<f64>() {
                    out.push(conf);
                }
            }
        }
    }
    out
}

fn confidence_class(confidence: f64) -> &'static str {
    if confidence >= 0.8 {
        "confidence-high"
    } else if confidence >= 0.6 {
        "confidence-medium"
    } else {
        "confidence-low"
    }
}

/// `revenue` -> `Revenue`, `decision_makers` -> `Decision Makers`.
fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary;

    fn annotated(name: &str, conf: &str) -> LeadRecord {
        let mut r = LeadRecord::from_pairs([("Business Name", name)]);
        r.set("revenue_confidence", conf);
        r.set("revenue_flags", r#"["STALE_DATA"]"#);
        r
    }

    #[test]
    fn test_report_contains_sections() {
        let records = vec![annotated("Acme Corp", "0.9"), annotated("Beta LLC", "0.4")];
        let s = summary::summarize(&records);
        let html = render_report(&records, Some(&s));

        assert!(html.contains("<h1>Data Validation Report</h1>"));
        assert!(html.contains("Total records:</strong> 2"));
        assert!(html.contains("Confidence Distribution"));
        assert!(html.contains("<h2>Revenue Validation</h2>"));
        assert!(html.contains("STALE_DATA (2 occurrences)"));
        assert!(html.contains("Acme Corp"));
    }

    #[test]
    fn test_confidence_cells_classed() {
        let records = vec![annotated("Acme Corp", "0.9")];
        let html = render_report(&records, None);
        assert!(html.contains(r#"<span class="confidence-high">0.90</span>"#));
    }

    #[test]
    fn test_weak_data_types_recommended() {
        let records = vec![annotated("A", "0.3"), annotated("B", "0.4")];
        let html = render_report(&records, None);
        assert!(html.contains("manually verified: revenue"));

        let strong = vec![annotated("A", "0.9")];
        let html = render_report(&strong, None);
        assert!(!html.contains("manually verified"));
    }

    #[test]
    fn test_values_escaped() {
        let mut r = LeadRecord::from_pairs([("Business Name", "Tom & Co <b>")]);
        r.set("revenue_confidence", "0.9");
        let html = render_report(&[r], None);
        assert!(html.contains("Tom &amp; Co &lt;b&gt;"));
    }

    #[test]
    fn test_sample_limited_to_ten_rows() {
        let records: Vec<LeadRecord> = (0..15)
            .map(|i| annotated(&format!("Company {i}"), "0.9"))
            .collect();
        let html = render_report(&records, None);
        assert!(html.contains("Company 9"));
        assert!(!html.contains("Company 10"));
    }
}
