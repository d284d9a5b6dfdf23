//! Field and key discovery across the two source tables.
//!
//! Sorting here is lexicographic on the string form and exists for
//! stable output ordering only.

use std::collections::BTreeSet;

use crate::model::{Table, EXCLUDED_FIELDS, SITE_NAME, TICKET_ID};

/// Sorted, deduplicated, non-blank site names across the given tables.
pub fn site_names(tables: &[&Table]) -> Vec<String> {
    collect_column(tables, SITE_NAME)
}

/// Sorted, deduplicated, non-blank ticket ids across the given tables.
pub fn ticket_ids(tables: &[&Table]) -> Vec<String> {
    collect_column(tables, TICKET_ID)
}

fn collect_column(tables: &[&Table], column: &str) -> Vec<String> {
    let mut values: BTreeSet<String> = BTreeSet::new();
    for table in tables {
        for row in &table.rows {
            let value = table.value(row, column).trim();
            if !value.is_empty() {
                values.insert(value.to_string());
            }
        }
    }
    values.into_iter().collect()
}

/// Sorted intersection of both tables' columns, minus the fixed
/// exclusion set and any configured extras.
///
/// A field is comparable purely by name co-occurrence; whether a given
/// value is numeric is decided later, per value. Symmetric in `a`/`b`.
pub fn comparable_fields(a: &Table, b: &Table, extra_exclusions: &[String]) -> Vec<String> {
    let b_cols: BTreeSet<&str> = b.columns.iter().map(String::as_str).collect();

    let mut fields: BTreeSet<String> = BTreeSet::new();
    for col in &a.columns {
        if b_cols.contains(col.as_str()) && !is_excluded(col, extra_exclusions) {
            fields.insert(col.clone());
        }
    }
    fields.into_iter().collect()
}

fn is_excluded(column: &str, extra: &[String]) -> bool {
    EXCLUDED_FIELDS.iter().any(|e| *e == column) || extra.iter().any(|e| e == column)
}
