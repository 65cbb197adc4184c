//! The `merge` subcommand: join annotation columns onto an original export.

use crate::cli::output::Styled;
use crate::merge;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Original lead CSV.
    #[arg(long)]
    pub original: PathBuf,

    /// Annotated CSV produced by `validate`.
    #[arg(long)]
    pub validated: PathBuf,

    /// Where to write the merged CSV.
    #[arg(long)]
    pub output: PathBuf,
}

pub fn run(args: MergeArgs) -> Result<()> {
    let s = Styled::new();
    let outcome = merge::merge_files(&args.original, &args.validated, &args.output)?;

    eprintln!(
        "  {} merged {} row(s), {} matched by business name",
        s.ok_sym(),
        outcome.rows,
        outcome.matched
    );
    eprintln!("  {} output: {}", s.ok_sym(), args.output.display());
    Ok(())
}
