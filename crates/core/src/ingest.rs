use csv::{ErrorKind, ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::domain::row::ResearchRow;

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CsvParseError {
    #[error("csv payload has an unterminated quoted field")]
    UnbalancedQuotes,
    #[error("csv record on line {line} has {found} fields but the header has {expected}")]
    UnequalLengths { line: u64, expected: u64, found: u64 },
    #[error("csv payload is malformed: {message}")]
    Malformed { line: Option<u64>, message: String },
}

/// Parses an uploaded sheet into rows keyed by its header.
///
/// Values are trimmed and blank lines never produce a row. Only CSV framing
/// is checked here; rows missing business fields are left for grouping to
/// exclude.
pub fn parse_rows(payload: &str) -> Result<Vec<ResearchRow>, CsvParseError> {
    let payload = payload.strip_prefix(BYTE_ORDER_MARK).unwrap_or(payload);
    ensure_balanced_quotes(payload)?;

    let mut reader =
        ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(payload.as_bytes());
    let headers = last_wins_headers(reader.headers()?);

    reader
        .records()
        .map(|record| {
            record?.deserialize::<ResearchRow>(Some(&headers)).map_err(CsvParseError::from)
        })
        .collect()
}

/// Blanks every header that appears again further right, so a repeated
/// column resolves to its last value instead of failing the sheet.
fn last_wins_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let repeated_later = headers.iter().skip(index + 1).any(|later| later == name);
            if repeated_later {
                ""
            } else {
                name
            }
        })
        .collect()
}

fn ensure_balanced_quotes(payload: &str) -> Result<(), CsvParseError> {
    // Escaped quotes come in pairs, so an odd count means a field was never closed.
    if payload.chars().filter(|ch| *ch == '"').count() % 2 == 0 {
        Ok(())
    } else {
        Err(CsvParseError::UnbalancedQuotes)
    }
}

impl From<csv::Error> for CsvParseError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|position| position.line());
        match error.kind() {
            ErrorKind::UnequalLengths { pos, expected_len, len } => Self::UnequalLengths {
                line: pos.as_ref().map(|position| position.line()).or(line).unwrap_or_default(),
                expected: *expected_len,
                found: *len,
            },
            _ => Self::Malformed { line, message: error.to_string() },
        }
    }
}
