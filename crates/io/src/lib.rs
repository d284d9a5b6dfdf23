//! `tickrec-io` — CSV ingestion for the reconciliation engine.
//!
//! Turns raw CSV text into a [`tickrec_recon::Table`] via an explicit,
//! ordered chain of parsing strategies. The chosen strategy and the
//! number of dropped rows are part of the outcome so callers (and tests)
//! can observe the fallback instead of a silent catch chain.

mod csv_table;

pub use csv_table::{
    parse_table, read_file_as_utf8, LoadError, LoadOutcome, ParseStrategy,
};
