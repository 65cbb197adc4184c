//! The `report` subcommand: HTML report from an annotated CSV.

use crate::cli::output::Styled;
use crate::lead;
use crate::report;
use crate::summary;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Annotated CSV produced by `validate`.
    #[arg(long)]
    pub input: PathBuf,

    /// Summary JSON produced by `validate` or `summarize`.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Where to write the HTML report.
    #[arg(long)]
    pub output: PathBuf,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let s = Styled::new();
    let rows = lead::read_rows(&args.input)?.records;
    let doc = args
        .summary
        .as_deref()
        .map(summary::read_summary)
        .transpose()?;

    report::write_report(&args.output, &rows, doc.as_ref())?;
    eprintln!("  {} report: {}", s.ok_sym(), args.output.display());
    Ok(())
}
