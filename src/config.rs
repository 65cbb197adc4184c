//! Runtime settings from CLI flags, environment variables, and a local
//! `.env` file.
//!
//! Precedence: CLI flags override environment variables, which override
//! `.env` entries (dotenvy never clobbers variables already set).

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Default number of leads processed between output flushes.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default assistant base URL.
pub const DEFAULT_ASSISTANT_URL: &str = "https://chat.openai.com";

/// How datapoints are grouped into prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BatchMode {
    /// One prompt per datapoint.
    #[default]
    Single,
    /// One combined prompt per lead covering all datapoints.
    Batch,
}

/// Assistant account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Login credentials, if configured.
    pub credentials: Option<Credentials>,
    /// Leads per batch (output is flushed after every batch).
    pub batch_size: usize,
    /// Prompt grouping mode.
    pub batch_mode: BatchMode,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Base URL of the assistant web UI.
    pub assistant_url: String,
    /// Directory for run logs and the audit trail.
    pub log_dir: PathBuf,
    /// Explicit Chrome/Chromium binary; browser auto-detection otherwise.
    pub chrome_path: Option<PathBuf>,
    /// Try to switch the assistant to its most capable model after login.
    pub prefer_advanced_model: bool,
}

impl Settings {
    /// Load settings from the environment, optionally sourcing an env file
    /// first.
    ///
    /// When `env_file` is given it must exist; otherwise a `.env` in the
    /// working directory is sourced if present.
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .with_context(|| format!("failed to read env file: {}", path.display()))?;
            }
            None => {
                let _ = dotenvy::dotenv();
            }
        }

        let credentials = match (env_var("LEADVET_EMAIL"), env_var("LEADVET_PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        let batch_size = match env_var("LEADVET_BATCH_SIZE") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("invalid LEADVET_BATCH_SIZE: {raw}"))?,
            None => DEFAULT_BATCH_SIZE,
        };

        let batch_mode = match env_var("LEADVET_BATCH_MODE").as_deref() {
            Some("batch") => BatchMode::Batch,
            Some("single") | None => BatchMode::Single,
            Some(other) => {
                anyhow::bail!("invalid LEADVET_BATCH_MODE: {other} (expected single or batch)")
            }
        };

        let headless = env_flag("LEADVET_HEADLESS");

        let assistant_url = env_var("LEADVET_ASSISTANT_URL")
            .unwrap_or_else(|| DEFAULT_ASSISTANT_URL.to_string());

        let log_dir = env_var("LEADVET_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_log_dir);

        let chrome_path = env_var("LEADVET_CHROME_PATH").map(PathBuf::from);

        Ok(Self {
            credentials,
            batch_size,
            batch_mode,
            headless,
            assistant_url,
            log_dir,
            chrome_path,
            prefer_advanced_model: true,
        })
    }
}

/// Default log directory: `~/.leadvet/logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".leadvet")
        .join("logs")
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Boolean env toggle: `1`, `true`, `yes` (case-insensitive) enable it.
fn env_flag(name: &str) -> bool {
    matches!(
        env_var(name).as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}
