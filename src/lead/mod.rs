//! Lead records and their CSV I/O.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::{read_rows, IngestedLeads, RowError};
pub use record::{DecisionMaker, LeadRecord, DECISION_MAKER_SLOTS, NOT_FOUND};
pub use writer::write_rows;
