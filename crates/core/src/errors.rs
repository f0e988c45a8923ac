use thiserror::Error;

use crate::ingest::CsvParseError;

/// Failures that end the processing of a single upload event.
///
/// None of these stop the process; the gateway logs them and keeps serving
/// other events. Per-group failures never reach this type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Parse(#[from] CsvParseError),
    #[error("attachment fetch failed: {0}")]
    Fetch(String),
    #[error("platform failure: {0}")]
    Integration(String),
}

impl ApplicationError {
    /// Stable label used as a structured log field and CLI error class.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Parse(_) => "csv_parse",
            Self::Fetch(_) => "attachment_fetch",
            Self::Integration(_) => "platform",
        }
    }
}
