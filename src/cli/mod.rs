//! CLI subcommand implementations for the leadvet binary.

pub mod doctor;
pub mod merge_cmd;
pub mod output;
pub mod report_cmd;
pub mod summarize_cmd;
pub mod validate_cmd;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::from_default_env().add_directive("leadvet=info".parse().unwrap())
}

/// Log to stderr. Used by the offline subcommands.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Log a validation run to a timestamped file under `log_dir`, keeping
/// stderr free for progress output. Returns the log file path.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log dir: {}", log_dir.display()))?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = log_dir.join(format!("validation_{stamp}.log"));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}
