//! The validation pipeline: leads in, annotated leads out.
//!
//! Reads a lead CSV, skips leads already present in the output from an
//! earlier interrupted run, walks the remainder in batches, asks the
//! assistant about each datapoint, and appends `_confidence`,
//! `_explanation` and `_flags` columns per datapoint. The output file is
//! rewritten after every batch so an interrupted run loses at most one
//! batch of work.

use crate::assistant::Assistant;
use crate::audit::{AuditLog, Interaction};
use crate::config::BatchMode;
use crate::lead::{self, LeadRecord, RowError, DECISION_MAKER_SLOTS};
use crate::prompt::{self, BatchItem};
use crate::verdict::{self, Verdict};
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Tuning knobs for a validation run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Leads per batch; output is flushed after each batch.
    pub batch_size: usize,
    /// One prompt per datapoint, or one combined prompt per lead.
    pub batch_mode: BatchMode,
}

/// What a finished run looked like.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Data rows read from the input CSV.
    pub rows_read: usize,
    /// Leads validated in this run.
    pub processed: usize,
    /// Leads skipped because the output already contained them.
    pub resumed: usize,
    /// Leads copied through untouched because they had nothing to validate.
    pub passed_through: usize,
    /// Input rows that failed to parse.
    pub row_errors: Vec<RowError>,
    pub output_path: PathBuf,
}

/// One datapoint of a lead, ready to be validated either way.
struct Datapoint {
    stem: String,
    prompt: String,
    item: BatchItem,
}

/// Drives one validation run against an assistant.
pub struct BatchProcessor<'a> {
    assistant: &'a mut dyn Assistant,
    audit: &'a mut AuditLog,
    options: PipelineOptions,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(
        assistant: &'a mut dyn Assistant,
        audit: &'a mut AuditLog,
        options: PipelineOptions,
    ) -> Self {
        Self {
            assistant,
            audit,
            options,
        }
    }

    /// Validate `input` into `output`. `progress` is called with
    /// `(done, total)` after each lead.
    pub async fn run(
        &mut self,
        input: &Path,
        output: &Path,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<PipelineOutcome> {
        let ingested = lead::read_rows(input)?;
        for err in &ingested.row_errors {
            warn!(line = err.line, "skipping unparseable row: {}", err.message);
        }

        // Leads already in the output were validated by an earlier run.
        let mut results = if output.exists() {
            lead::read_rows(output)?.records
        } else {
            Vec::new()
        };
        let done_names: HashSet<String> = results
            .iter()
            .filter_map(|r| r.business_name())
            .map(str::to_lowercase)
            .collect();

        let mut pending = Vec::new();
        let mut resumed = 0usize;
        for record in ingested.records {
            let seen = record
                .business_name()
                .map(|n| done_names.contains(&n.to_lowercase()))
                .unwrap_or(false);
            if seen {
                resumed += 1;
            } else {
                pending.push(record);
            }
        }

        if resumed > 0 {
            info!(resumed, "resuming: leads already present in output");
        }

        let total = pending.len();
        let batch_size = self.options.batch_size.max(1);
        let mut processed = 0usize;
        let mut passed_through = 0usize;

        let mut iter = pending.into_iter().peekable();
        while iter.peek().is_some() {
            let batch: Vec<LeadRecord> = iter.by_ref().take(batch_size).collect();
            for mut record in batch {
                if record.has_datapoints() {
                    match self.options.batch_mode {
                        BatchMode::Single => self.validate_each(&mut record).await,
                        BatchMode::Batch => self.validate_combined(&mut record).await,
                    }
                    processed += 1;
                } else {
                    passed_through += 1;
                }
                results.push(record);
                progress(processed + passed_through, total);
            }

            // Flush so an interrupted run can resume from here.
            lead::write_rows(output, &results)?;
            info!(
                written = results.len(),
                "batch complete, output flushed"
            );
        }

        // An empty input still produces a (possibly empty) output file.
        lead::write_rows(output, &results)?;

        Ok(PipelineOutcome {
            rows_read: ingested.rows_read,
            processed,
            resumed,
            passed_through,
            row_errors: ingested.row_errors,
            output_path: output.to_path_buf(),
        })
    }

    /// One prompt per datapoint.
    async fn validate_each(&mut self, record: &mut LeadRecord) {
        let name = record.business_name().unwrap_or("Unknown Company").to_string();
        let mut failure: Option<String> = None;
        for dp in datapoints(record) {
            let started = Instant::now();
            let verdict = match self.assistant.ask(&dp.prompt).await {
                Ok(reply) => verdict::parse_verdict(&reply),
                Err(e) => {
                    warn!(lead = %name, datapoint = %dp.stem, "assistant request failed: {e:#}");
                    failure.get_or_insert_with(|| format!("{e:#}"));
                    Verdict::transport_error(&format!("{e:#}"))
                }
            };
            self.record_audit(&name, &dp.stem, &verdict, started);
            annotate(record, &dp.stem, &verdict);
        }
        if let Some(message) = failure {
            record.set("validation_error", message);
        }
    }

    /// One combined prompt covering all of the lead's datapoints.
    async fn validate_combined(&mut self, record: &mut LeadRecord) {
        let name = record.business_name().unwrap_or("Unknown Company").to_string();
        let points = datapoints(record);
        let items: Vec<BatchItem> = points.iter().map(|dp| dp.item.clone()).collect();
        let prompt = prompt::batch_prompt(record, &items);

        let started = Instant::now();
        let mut verdicts = match self.assistant.ask(&prompt).await {
            Ok(reply) => match verdict::parse_batch(&reply) {
                Ok(map) => map,
                Err(e) => {
                    warn!(lead = %name, "batch reply unparseable: {e}");
                    record.set("validation_error", e.to_string());
                    points
                        .iter()
                        .map(|dp| (dp.stem.clone(), Verdict::parse_error(&e.to_string())))
                        .collect()
                }
            },
            Err(e) => {
                warn!(lead = %name, "assistant request failed: {e:#}");
                record.set("validation_error", format!("{e:#}"));
                points
                    .iter()
                    .map(|dp| (dp.stem.clone(), Verdict::transport_error(&format!("{e:#}"))))
                    .collect()
            }
        };

        for dp in &points {
            let verdict = verdicts.remove(&dp.stem).unwrap_or_else(|| {
                Verdict::transport_error("no verdict returned for this data point")
            });
            self.record_audit(&name, &dp.stem, &verdict, started);
            annotate(record, &dp.stem, &verdict);
        }
    }

    fn record_audit(&mut self, lead: &str, datapoint: &str, verdict: &Verdict, started: Instant) {
        let failed = verdict
            .flags
            .iter()
            .any(|f| f == verdict::FLAG_VALIDATION_ERROR);
        let status = if failed { "error" } else { "ok" };
        self.audit.record(Interaction {
            lead: lead.to_string(),
            datapoint: datapoint.to_string(),
            status: status.to_string(),
            confidence: Some(verdict.confidence),
            duration_ms: started.elapsed().as_millis() as u64,
            detail: failed.then(|| verdict.explanation.clone()),
        });
    }
}

/// All validatable datapoints of a lead, in column order.
fn datapoints(record: &LeadRecord) -> Vec<Datapoint> {
    let mut out = Vec::new();

    if let Some(revenue) = record.value("estimated_revenue") {
        out.push(Datapoint {
            stem: "revenue".to_string(),
            prompt: prompt::revenue_prompt(record),
            item: BatchItem {
                name: "revenue".to_string(),
                value: revenue.to_string(),
                source: record.value("source").map(str::to_string),
            },
        });
    }

    if let Some(count) = record.value("Company Size") {
        out.push(Datapoint {
            stem: "employee_count".to_string(),
            prompt: prompt::employee_count_prompt(record),
            item: BatchItem {
                name: "employee_count".to_string(),
                value: count.to_string(),
                source: Some("LinkedIn".to_string()),
            },
        });
    }

    for n in 1..=DECISION_MAKER_SLOTS {
        if let Some(dm) = record.decision_maker(n) {
            out.push(Datapoint {
                stem: format!("decision_maker_{n}"),
                prompt: prompt::decision_maker_prompt(record, &dm),
                item: BatchItem {
                    name: format!("decision_maker_{n}"),
                    value: format!("{} ({})", dm.name, dm.title),
                    source: dm.source.clone(),
                },
            });
        }
    }

    out
}

/// Append the three annotation columns for one datapoint.
fn annotate(record: &mut LeadRecord, stem: &str, verdict: &Verdict) {
    record.set(&format!("{stem}_confidence"), format!("{:.2}", verdict.confidence));
    record.set(&format!("{stem}_explanation"), verdict.explanation.clone());
    let flags = serde_json::to_string(&verdict.flags).unwrap_or_else(|_| "[]".to_string());
    record.set(&format!("{stem}_flags"), flags);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io::Write;

    /// Replays a fixed list of replies and records every prompt it saw.
    struct ScriptedAssistant {
        replies: VecDeque<Result<String>>,
        prompts: Vec<String>,
    }

    impl ScriptedAssistant {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: replies.into(),
                prompts: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Assistant for ScriptedAssistant {
        async fn ask(&mut self, prompt: &str) -> Result<String> {
            self.prompts.push(prompt.to_string());
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
        }
    }

    fn good_reply(confidence: f64) -> Result<String> {
        Ok(format!(
            r#"{{"confidence": {confidence}, "explanation": "Looks plausible", "flags": []}}"#
        ))
    }

    fn write_input(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("leads.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn options(batch_mode: BatchMode) -> PipelineOptions {
        PipelineOptions {
            batch_size: 2,
            batch_mode,
        }
    }

    #[tokio::test]
    async fn test_single_mode_annotates_each_datapoint() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "Business Name,estimated_revenue,Decision Maker 1 Name,Decision Maker 1 Title\n\
             Acme Corp,$4.5M,Jo Reyes,CEO\n",
        );
        let output = dir.path().join("validated.csv");

        let mut assistant = ScriptedAssistant::new(vec![good_reply(0.85), good_reply(0.6)]);
        let mut audit = AuditLog::disabled();
        let mut processor =
            BatchProcessor::new(&mut assistant, &mut audit, options(BatchMode::Single));
        let outcome = processor.run(&input, &output, &mut |_, _| {}).await.unwrap();

        assert_eq!(outcome.processed, 1);
        assert_eq!(assistant.prompts.len(), 2);

        let rows = lead::read_rows(&output).unwrap().records;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("revenue_confidence"), Some("0.85"));
        assert_eq!(rows[0].get("revenue_explanation"), Some("Looks plausible"));
        assert_eq!(rows[0].get("revenue_flags"), Some("[]"));
        assert_eq!(rows[0].get("decision_maker_1_confidence"), Some("0.60"));
    }

    #[tokio::test]
    async fn test_transport_error_marks_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "Business Name,estimated_revenue\nAcme Corp,$4.5M\n",
        );
        let output = dir.path().join("validated.csv");

        let mut assistant =
            ScriptedAssistant::new(vec![Err(anyhow::anyhow!("browser closed"))]);
        let mut audit = AuditLog::disabled();
        let mut processor =
            BatchProcessor::new(&mut assistant, &mut audit, options(BatchMode::Single));
        processor.run(&input, &output, &mut |_, _| {}).await.unwrap();

        let rows = lead::read_rows(&output).unwrap().records;
        assert_eq!(rows[0].get("revenue_confidence"), Some("0.00"));
        assert!(rows[0]
            .get("revenue_flags")
            .unwrap()
            .contains("VALIDATION_ERROR"));
        assert!(rows[0]
            .get("validation_error")
            .unwrap()
            .contains("browser closed"));
    }

    #[tokio::test]
    async fn test_resume_skips_leads_already_in_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "Business Name,estimated_revenue\n\
             Acme Corp,$4.5M\n\
             Beta LLC,$1.2M\n",
        );
        let output = dir.path().join("validated.csv");
        std::fs::write(
            &output,
            "Business Name,estimated_revenue,revenue_confidence\nAcme Corp,$4.5M,0.90\n",
        )
        .unwrap();

        let mut assistant = ScriptedAssistant::new(vec![good_reply(0.7)]);
        let mut audit = AuditLog::disabled();
        let mut processor =
            BatchProcessor::new(&mut assistant, &mut audit, options(BatchMode::Single));
        let outcome = processor.run(&input, &output, &mut |_, _| {}).await.unwrap();

        assert_eq!(outcome.resumed, 1);
        assert_eq!(outcome.processed, 1);
        // Only Beta LLC was asked about.
        assert_eq!(assistant.prompts.len(), 1);
        assert!(assistant.prompts[0].contains("Beta LLC"));

        let rows = lead::read_rows(&output).unwrap().records;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("revenue_confidence"), Some("0.90"));
        assert_eq!(rows[1].get("revenue_confidence"), Some("0.70"));
    }

    #[tokio::test]
    async fn test_batch_mode_sends_one_prompt_per_lead() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "Business Name,estimated_revenue,Company Size\nAcme Corp,$4.5M,51-200\n",
        );
        let output = dir.path().join("validated.csv");

        let reply = r#"
        {
          "data_points": {
            "revenue": {"confidence": 0.8, "explanation": "ok", "flags": []},
            "employee_count": {"confidence": 0.4, "explanation": "stale", "flags": ["STALE_DATA"]}
          }
        }"#;
        let mut assistant = ScriptedAssistant::new(vec![Ok(reply.to_string())]);
        let mut audit = AuditLog::disabled();
        let mut processor =
            BatchProcessor::new(&mut assistant, &mut audit, options(BatchMode::Batch));
        processor.run(&input, &output, &mut |_, _| {}).await.unwrap();

        assert_eq!(assistant.prompts.len(), 1);
        let rows = lead::read_rows(&output).unwrap().records;
        assert_eq!(rows[0].get("revenue_confidence"), Some("0.80"));
        assert_eq!(rows[0].get("employee_count_confidence"), Some("0.40"));
        assert!(rows[0]
            .get("employee_count_flags")
            .unwrap()
            .contains("STALE_DATA"));
    }

    #[tokio::test]
    async fn test_batch_reply_missing_datapoint_marks_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "Business Name,estimated_revenue,Company Size\nAcme Corp,$4.5M,51-200\n",
        );
        let output = dir.path().join("validated.csv");

        let reply = r#"{"data_points": {"revenue": {"confidence": 0.8, "explanation": "ok", "flags": []}}}"#;
        let mut assistant = ScriptedAssistant::new(vec![Ok(reply.to_string())]);
        let mut audit = AuditLog::disabled();
        let mut processor =
            BatchProcessor::new(&mut assistant, &mut audit, options(BatchMode::Batch));
        processor.run(&input, &output, &mut |_, _| {}).await.unwrap();

        let rows = lead::read_rows(&output).unwrap().records;
        assert_eq!(rows[0].get("revenue_confidence"), Some("0.80"));
        assert_eq!(rows[0].get("employee_count_confidence"), Some("0.00"));
        assert!(rows[0]
            .get("employee_count_flags")
            .unwrap()
            .contains("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_lead_without_datapoints_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "Business Name,Industry\nHollow Inc,Retail\n",
        );
        let output = dir.path().join("validated.csv");

        let mut assistant = ScriptedAssistant::new(vec![]);
        let mut audit = AuditLog::disabled();
        let mut processor =
            BatchProcessor::new(&mut assistant, &mut audit, options(BatchMode::Single));
        let outcome = processor.run(&input, &output, &mut |_, _| {}).await.unwrap();

        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.passed_through, 1);
        assert!(assistant.prompts.is_empty());

        let rows = lead::read_rows(&output).unwrap().records;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Industry"), Some("Retail"));
    }

    #[tokio::test]
    async fn test_empty_input_writes_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "Business Name,Industry\n");
        let output = dir.path().join("validated.csv");

        let mut assistant = ScriptedAssistant::new(vec![]);
        let mut audit = AuditLog::disabled();
        let mut processor =
            BatchProcessor::new(&mut assistant, &mut audit, options(BatchMode::Single));
        let outcome = processor.run(&input, &output, &mut |_, _| {}).await.unwrap();

        assert_eq!(outcome.rows_read, 0);
        assert!(output.exists());
    }
}
