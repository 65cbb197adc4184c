//! The `validate` subcommand: run the full pipeline against the assistant.

use crate::assistant::{Assistant, BrowserAssistant};
use crate::audit::AuditLog;
use crate::cli::output::{self, Styled};
use crate::config::{BatchMode, Settings};
use crate::lead;
use crate::pipeline::{BatchProcessor, PipelineOptions};
use crate::summary;
use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Lead CSV to validate.
    #[arg(long)]
    pub input: PathBuf,

    /// Annotated CSV to write (reused for resume).
    #[arg(long)]
    pub output: PathBuf,

    /// Also write a summary JSON here.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Leads per batch; overrides LEADVET_BATCH_SIZE.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Prompt grouping; overrides LEADVET_BATCH_MODE.
    #[arg(long, value_enum)]
    pub batch_mode: Option<BatchMode>,

    /// Run the browser headless; overrides LEADVET_HEADLESS.
    #[arg(long)]
    pub headless: Option<bool>,

    /// Env file to source instead of `.env`.
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

pub async fn run(args: ValidateArgs) -> Result<()> {
    let mut settings = Settings::load(args.env_file.as_deref())?;
    if let Some(n) = args.batch_size {
        settings.batch_size = n.max(1);
    }
    if let Some(mode) = args.batch_mode {
        settings.batch_mode = mode;
    }
    if let Some(headless) = args.headless {
        settings.headless = headless;
    }

    let log_path = crate::cli::init_file_logging(&settings.log_dir)?;
    let s = Styled::new();
    output::print_header(&s);
    eprintln!("  {} {}", s.dim("log:"), log_path.display());

    let mut audit = AuditLog::create(&settings.log_dir)?;
    info!(run_id = audit.run_id(), input = %args.input.display(), "starting validation run");

    let started = Instant::now();
    let mut assistant = BrowserAssistant::launch(&settings).await?;

    let options = PipelineOptions {
        batch_size: settings.batch_size,
        batch_mode: settings.batch_mode,
    };

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("  {spinner} [{bar:30}] {pos}/{len} leads")?
            .progress_chars("=> "),
    );

    let mut progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };
    let result = BatchProcessor::new(&mut assistant, &mut audit, options)
        .run(&args.input, &args.output, &mut progress)
        .await;
    bar.finish_and_clear();

    // The browser comes down regardless of how the run ended.
    if let Err(e) = assistant.close().await {
        eprintln!("  {} failed to close browser: {e:#}", s.warn_sym());
    }
    let outcome = result?;

    eprintln!(
        "  {} validated {} lead(s) in {}",
        s.ok_sym(),
        outcome.processed,
        output::format_duration(started.elapsed().as_secs()),
    );
    if outcome.resumed > 0 {
        eprintln!("  {} skipped {} already-validated lead(s)", s.ok_sym(), outcome.resumed);
    }
    if outcome.passed_through > 0 {
        eprintln!(
            "  {} passed through {} lead(s) with nothing to validate",
            s.ok_sym(),
            outcome.passed_through
        );
    }
    if !outcome.row_errors.is_empty() {
        eprintln!(
            "  {} {} input row(s) could not be parsed (see log)",
            s.warn_sym(),
            outcome.row_errors.len()
        );
    }
    eprintln!("  {} output: {}", s.ok_sym(), outcome.output_path.display());

    if let Some(summary_path) = &args.summary {
        let rows = lead::read_rows(&outcome.output_path)?.records;
        let doc = summary::summarize(&rows);
        summary::write_summary(summary_path, &doc)?;
        eprintln!("  {} summary: {}", s.ok_sym(), summary_path.display());
    }

    Ok(())
}
