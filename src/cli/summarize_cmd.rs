//! The `summarize` subcommand: summary JSON from an annotated CSV.

use crate::cli::output::Styled;
use crate::lead;
use crate::summary;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SummarizeArgs {
    /// Annotated CSV produced by `validate`.
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the summary JSON.
    #[arg(long)]
    pub output: PathBuf,
}

pub fn run(args: SummarizeArgs) -> Result<()> {
    let s = Styled::new();
    let rows = lead::read_rows(&args.input)?.records;
    let doc = summary::summarize(&rows);
    summary::write_summary(&args.output, &doc)?;

    eprintln!(
        "  {} summarized {} record(s) across {} data type(s)",
        s.ok_sym(),
        doc.total_records,
        doc.data_types.len()
    );
    eprintln!("  {} summary: {}", s.ok_sym(), args.output.display());
    Ok(())
}
