// CSV text -> Table, with strict/tolerant strategy fallback

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use tickrec_recon::model::Record;
use tickrec_recon::Table;

/// Date formats attempted for `Date`-column coercion, in order.
/// Unparseable values become blank rather than failing the load.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

const DATE_COLUMN: &str = "Date";

// ---------------------------------------------------------------------------
// Outcome + errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// Every row must match the header arity exactly.
    Strict,
    /// Flexible reader; rows with the wrong arity are dropped and counted.
    Tolerant,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Tolerant => write!(f, "tolerant"),
        }
    }
}

/// A parsed table plus how it was obtained.
#[derive(Debug)]
pub struct LoadOutcome {
    pub table: Table,
    pub strategy: ParseStrategy,
    pub dropped_rows: usize,
}

#[derive(Debug)]
pub enum LoadError {
    /// Input has no header row at all.
    NoHeader,
    /// CSV reader error that even the tolerant strategy cannot get past.
    Csv(String),
    /// File read error (local sources).
    Io(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHeader => write!(f, "input has no header row"),
            Self::Csv(msg) => write!(f, "CSV parse error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse CSV text into a table, trying each strategy in order.
///
/// Header names are trimmed; duplicate headers keep the first occurrence
/// and later columns with the same name are ignored. A `Date` column is
/// coerced to ISO `YYYY-MM-DD` per value, blank on failure.
pub fn parse_table(text: &str) -> Result<LoadOutcome, LoadError> {
    let strategies = [ParseStrategy::Strict, ParseStrategy::Tolerant];

    let mut last_err = LoadError::NoHeader;
    for strategy in strategies {
        match parse_with(text, strategy) {
            Ok(outcome) => {
                if outcome.dropped_rows > 0 {
                    log::warn!(
                        "{} parse dropped {} malformed row(s)",
                        strategy,
                        outcome.dropped_rows
                    );
                }
                return Ok(outcome);
            }
            Err(e) => {
                log::warn!("{strategy} parse failed: {e}");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

fn parse_with(text: &str, strategy: ParseStrategy) -> Result<LoadOutcome, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(matches!(strategy, ParseStrategy::Tolerant))
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Csv(e.to_string()))?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeader);
    }

    // Deduplicate headers: first occurrence keeps its position, later
    // duplicates are ignored entirely.
    let mut columns: Vec<String> = Vec::new();
    let mut keep: Vec<Option<usize>> = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        if columns.iter().any(|c| c == header) {
            keep.push(None);
        } else {
            columns.push(header.to_string());
            keep.push(Some(columns.len() - 1));
        }
    }

    let has_date = columns.iter().any(|c| c == DATE_COLUMN);
    let arity = headers.len();

    let mut rows: Vec<Record> = Vec::new();
    let mut dropped = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => match strategy {
                ParseStrategy::Strict => return Err(LoadError::Csv(e.to_string())),
                ParseStrategy::Tolerant => {
                    dropped += 1;
                    continue;
                }
            },
        };

        if record.len() != arity {
            // Strict readers already error on this; the check only fires
            // under the flexible reader.
            dropped += 1;
            continue;
        }

        let mut row: Record = HashMap::with_capacity(columns.len());
        for (i, field) in record.iter().enumerate() {
            if let Some(col_idx) = keep[i] {
                let column = &columns[col_idx];
                let value = if has_date && column == DATE_COLUMN {
                    coerce_date(field)
                } else {
                    field.to_string()
                };
                row.insert(column.clone(), value);
            }
        }
        rows.push(row);
    }

    Ok(LoadOutcome {
        table: Table::new(columns, rows),
        strategy,
        dropped_rows: dropped,
    })
}

/// Normalize a date cell to ISO `YYYY-MM-DD`; blank when unparseable.
fn coerce_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    String::new()
}

// ---------------------------------------------------------------------------
// File reading
// ---------------------------------------------------------------------------

/// Read a file and convert to UTF-8 if needed (handles Windows-1252,
/// common for Excel-exported CSVs).
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let mut file = std::fs::File::open(path).map_err(|e| LoadError::Io(e.to_string()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| LoadError::Io(e.to_string()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
