//! JSONL audit trail of assistant interactions.
//!
//! Every prompt submitted during a run is recorded as one JSON line, so a
//! reviewer can reconstruct exactly what was asked, when, and what came back.
//! The trail is append-only and best-effort: a full disk never aborts a run.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// One recorded assistant interaction.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// RFC 3339 timestamp of when the interaction finished.
    pub timestamp: String,
    /// Identifies the run this event belongs to.
    pub run_id: String,
    /// Business name of the lead under validation.
    pub lead: String,
    /// Datapoint name, or `batch` for a combined prompt.
    pub datapoint: String,
    /// `ok` or `error`.
    pub status: String,
    /// Confidence extracted from the reply, when one was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Wall-clock time the interaction took.
    pub duration_ms: u64,
    /// Error detail for failed interactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// What to record about one interaction. Timestamp and run id are filled
/// in by the log.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    pub lead: String,
    pub datapoint: String,
    pub status: String,
    pub confidence: Option<f64>,
    pub duration_ms: u64,
    pub detail: Option<String>,
}

/// Append-only JSONL sink for audit events.
pub struct AuditLog {
    run_id: String,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Open a fresh audit file under `dir`, named after the current time.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create audit directory: {}", dir.display()))?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("audit_{stamp}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open audit file: {}", path.display()))?;

        Ok(Self {
            run_id: Uuid::new_v4().to_string(),
            writer: Some(BufWriter::new(file)),
            path: Some(path),
        })
    }

    /// An audit log that records nothing. Used by tests and dry runs.
    pub fn disabled() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            writer: None,
            path: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one event. Write failures are logged and swallowed.
    pub fn record(&mut self, interaction: Interaction) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        let event = AuditEvent {
            timestamp: Utc::now().to_rfc3339(),
            run_id: self.run_id.clone(),
            lead: interaction.lead,
            datapoint: interaction.datapoint,
            status: interaction.status,
            confidence: interaction.confidence,
            duration_ms: interaction.duration_ms,
            detail: interaction.detail,
        };

        let line = match serde_json::to_string(&event) {
            Ok(l) => l,
            Err(e) => {
                warn!("failed to encode audit event: {e}");
                return;
            }
        };
        if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!("failed to write audit event: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_append_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = AuditLog::create(dir.path()).unwrap();
        log.record(Interaction {
            lead: "Acme Corp".to_string(),
            datapoint: "revenue".to_string(),
            status: "ok".to_string(),
            confidence: Some(0.85),
            duration_ms: 1200,
            detail: None,
        });
        log.record(Interaction {
            lead: "Acme Corp".to_string(),
            datapoint: "employee_count".to_string(),
            status: "error".to_string(),
            confidence: None,
            duration_ms: 300,
            detail: Some("browser closed".to_string()),
        });

        let contents = std::fs::read_to_string(log.path().unwrap()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["lead"], "Acme Corp");
        assert_eq!(first["datapoint"], "revenue");
        assert_eq!(first["status"], "ok");
        assert_eq!(first["run_id"], log.run_id());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["detail"], "browser closed");
        assert!(second.get("confidence").is_none());
    }

    #[test]
    fn test_disabled_log_records_nothing() {
        let mut log = AuditLog::disabled();
        log.record(Interaction {
            lead: "Acme Corp".to_string(),
            datapoint: "revenue".to_string(),
            status: "ok".to_string(),
            confidence: Some(0.9),
            duration_ms: 10,
            detail: None,
        });
        assert!(log.path().is_none());
    }
}
