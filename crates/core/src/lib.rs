//! Sheet-to-thread pipeline shared by the bot and the operator CLI.
//!
//! ```text
//! CSV text → ingest → grouping (channel, then identity+deadline) → format → plan
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod format;
pub mod grouping;
pub mod ingest;
pub mod plan;

pub use domain::row::ResearchRow;
pub use errors::ApplicationError;
pub use format::{DeadlineError, DisplayDeadline};
pub use grouping::{ChannelGroup, ThreadGroup};
pub use ingest::{parse_rows, CsvParseError};
pub use plan::{PlannedChannel, PlannedThread, RejectedThread, ThreadPlan};
