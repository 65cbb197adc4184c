//! Leadvet — validate business lead data through a browser-driven
//! conversational assistant.
//!
//! The pipeline reads lead records from CSV, submits each datapoint (revenue,
//! employee count, decision makers) to an assistant for judgment, parses the
//! free-text reply into a confidence score, explanation, and issue flags, and
//! writes an annotated CSV plus an aggregate summary JSON.

pub mod assistant;
pub mod audit;
pub mod cli;
pub mod config;
pub mod lead;
pub mod merge;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod summary;
pub mod verdict;
