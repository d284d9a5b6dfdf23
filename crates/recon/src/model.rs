use std::collections::HashMap;

use serde::Serialize;

/// Column name of the join key between the two tables.
pub const TICKET_ID: &str = "Ticket ID";

/// Column name of the site a ticket belongs to.
pub const SITE_NAME: &str = "Site Name";

/// Columns never eligible for numeric deviation, regardless of
/// co-occurrence. Free-text and identity columns.
pub const EXCLUDED_FIELDS: &[&str] = &[
    TICKET_ID,
    SITE_NAME,
    "Date",
    "Remarks",
    "Comments",
    "Timestamp",
];

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row of a source table, keyed by column name.
pub type Record = HashMap<String, String>;

/// An ordered sequence of records sharing a column set.
///
/// `columns` preserves CSV header order; the loader has already trimmed
/// names and deduplicated headers (first occurrence wins). Records may
/// omit columns; a missing key reads as the empty string.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    /// Empty table: the "no data" value every failure path collapses to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Field value of `row`, empty string when absent.
    pub fn value<'a>(&self, row: &'a Record, column: &str) -> &'a str {
        row.get(column).map(String::as_str).unwrap_or("")
    }

    /// Trimmed ticket id of `row`; empty when the column is absent.
    pub fn ticket_id<'a>(&self, row: &'a Record) -> &'a str {
        self.value(row, TICKET_ID).trim()
    }
}

// ---------------------------------------------------------------------------
// Single-ticket comparison
// ---------------------------------------------------------------------------

/// One field of a ticket comparison.
///
/// `deviation` is `Some` only for comparable fields where at least one
/// side parsed as a number; both sides non-numeric stays `None` so "both
/// missing" is distinguishable from "one side missing" (which reads as 0
/// on the missing side).
#[derive(Debug, Clone, Serialize)]
pub struct FieldEntry {
    pub field: String,
    pub reported: String,
    pub billable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation: Option<f64>,
    pub comparable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketComparison {
    pub ticket: String,
    pub site: String,
    pub in_reported: bool,
    pub in_billable: bool,
    /// Rows beyond the first carrying the same ticket id. First match
    /// wins; these counts make the ambiguity observable.
    pub duplicates_reported: usize,
    pub duplicates_billable: usize,
    pub entries: Vec<FieldEntry>,
}

impl TicketComparison {
    /// True when the ticket exists in neither table.
    pub fn is_unmatched(&self) -> bool {
        !self.in_reported && !self.in_billable
    }
}

// ---------------------------------------------------------------------------
// Bulk report
// ---------------------------------------------------------------------------

/// One output row of the bulk reconciliation: a ticket, its resolved
/// site, and one deviation per comparable field (parallel to
/// `DeviationReport::fields`).
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub ticket: String,
    pub site: String,
    pub deviations: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub reported_rows: usize,
    pub billable_rows: usize,
    /// Distinct non-blank ticket ids across both tables (outer-join
    /// cardinality before any site filter).
    pub tickets: usize,
    pub matched: usize,
    pub reported_only: usize,
    pub billable_only: usize,
    pub duplicate_tickets_reported: usize,
    pub duplicate_tickets_billable: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviationReport {
    /// Output header: `Ticket ID`, `Site`, then one column per
    /// comparable field.
    pub columns: Vec<String>,
    /// The comparable fields, sorted; parallel to each row's deviations.
    pub fields: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
}
