//! Lead validation CLI: drive a chat assistant's web UI to score the
//! datapoints of a lead export.

use anyhow::Result;
use clap::{Parser, Subcommand};
use leadvet::cli::{self, doctor, merge_cmd, report_cmd, summarize_cmd, validate_cmd};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "leadvet",
    version,
    about = "Validate lead exports against a chat assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a lead CSV and write annotated results
    Validate(validate_cmd::ValidateArgs),
    /// Build a summary JSON from an annotated CSV
    Summarize(summarize_cmd::SummarizeArgs),
    /// Render an HTML report from an annotated CSV
    Report(report_cmd::ReportArgs),
    /// Merge annotation columns onto an original export
    Merge(merge_cmd::MergeArgs),
    /// Check that the environment is ready for a run
    Doctor {
        /// Input CSV to check for readability.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Env file to source instead of `.env`.
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    match args.command {
        Command::Validate(args) => validate_cmd::run(args).await,
        Command::Summarize(args) => {
            cli::init_stderr_logging();
            summarize_cmd::run(args)
        }
        Command::Report(args) => {
            cli::init_stderr_logging();
            report_cmd::run(args)
        }
        Command::Merge(args) => {
            cli::init_stderr_logging();
            merge_cmd::run(args)
        }
        Command::Doctor { input, env_file } => doctor::run(input.as_deref(), env_file.as_deref()),
    }
}
