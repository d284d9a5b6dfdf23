//! Single-ticket comparator: one reported/billable/deviation triple per
//! field for a requested ticket id.

use crate::fields::comparable_fields;
use crate::model::{FieldEntry, Record, Table, TicketComparison, SITE_NAME, TICKET_ID};
use crate::numeric::parse_number;

/// Compare one ticket across the reported and billable tables.
///
/// Matching is case-sensitive exact equality after trimming both sides.
/// Absence in a table yields empty values for that side, not an error.
/// When a ticket id occurs more than once in a table, the first row wins
/// and the surplus count is reported on the result.
pub fn compare_ticket(
    ticket: &str,
    reported: &Table,
    billable: &Table,
    extra_exclusions: &[String],
) -> TicketComparison {
    let ticket = ticket.trim();
    let (reported_row, reported_matches) = find_ticket(reported, ticket);
    let (billable_row, billable_matches) = find_ticket(billable, ticket);

    let site = resolve_site(reported, reported_row, billable, billable_row);
    let comparable = comparable_fields(reported, billable, extra_exclusions);

    let mut entries = Vec::new();
    for field in field_universe(reported, billable) {
        let reported_val = side_value(reported, reported_row, &field);
        let billable_val = side_value(billable, billable_row, &field);
        let is_comparable = comparable.iter().any(|f| f == &field);

        if is_comparable {
            entries.push(FieldEntry {
                deviation: deviation(reported_val, billable_val),
                field,
                reported: reported_val.to_string(),
                billable: billable_val.to_string(),
                comparable: true,
            });
        } else if !reported_val.trim().is_empty() || !billable_val.trim().is_empty() {
            // Raw pass-through, only when one side has something to show
            entries.push(FieldEntry {
                field,
                reported: reported_val.to_string(),
                billable: billable_val.to_string(),
                deviation: None,
                comparable: false,
            });
        }
    }

    TicketComparison {
        ticket: ticket.to_string(),
        site,
        in_reported: reported_row.is_some(),
        in_billable: billable_row.is_some(),
        duplicates_reported: reported_matches.saturating_sub(1),
        duplicates_billable: billable_matches.saturating_sub(1),
        entries,
    }
}

/// Deviation = billable − reported, with 0 for whichever side fails to
/// parse. Both sides non-numeric is `None`: blank, never zero.
fn deviation(reported: &str, billable: &str) -> Option<f64> {
    match (parse_number(reported), parse_number(billable)) {
        (None, None) => None,
        (r, b) => Some(b.unwrap_or(0.0) - r.unwrap_or(0.0)),
    }
}

/// First row matching `ticket` plus the total number of matches.
fn find_ticket<'a>(table: &'a Table, ticket: &str) -> (Option<&'a Record>, usize) {
    let mut first = None;
    let mut count = 0;
    for row in &table.rows {
        if table.ticket_id(row) == ticket && !ticket.is_empty() {
            if first.is_none() {
                first = Some(row);
            }
            count += 1;
        }
    }
    (first, count)
}

/// Reported-side site name if non-blank, else the billable side.
fn resolve_site(
    reported: &Table,
    reported_row: Option<&Record>,
    billable: &Table,
    billable_row: Option<&Record>,
) -> String {
    let from_reported = reported_row
        .map(|r| reported.value(r, SITE_NAME).trim())
        .unwrap_or("");
    if !from_reported.is_empty() {
        return from_reported.to_string();
    }
    billable_row
        .map(|r| billable.value(r, SITE_NAME).trim())
        .unwrap_or("")
        .to_string()
}

/// Union of both column sets minus the join key and site name: reported
/// column order first, then billable-only columns in their own order.
fn field_universe(reported: &Table, billable: &Table) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for col in reported.columns.iter().chain(billable.columns.iter()) {
        if col == TICKET_ID || col == SITE_NAME {
            continue;
        }
        if !fields.iter().any(|f| f == col) {
            fields.push(col.clone());
        }
    }
    fields
}

fn side_value<'a>(table: &Table, row: Option<&'a Record>, field: &str) -> &'a str {
    row.map(|r| table.value(r, field)).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table(columns: &[&str], rows: &[&[(&str, &str)]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<HashMap<_, _>>()
                })
                .collect(),
        )
    }

    fn sample_tables() -> (Table, Table) {
        let reported = table(
            &["Ticket ID", "Site Name", "Hours", "Visits", "Remarks"],
            &[
                &[
                    ("Ticket ID", "T1"),
                    ("Site Name", "Alpha"),
                    ("Hours", "10"),
                    ("Visits", "2"),
                    ("Remarks", "first pass"),
                ],
                &[
                    ("Ticket ID", "T2"),
                    ("Site Name", "Beta"),
                    ("Hours", "4"),
                    ("Visits", ""),
                    ("Remarks", ""),
                ],
            ],
        );
        let billable = table(
            &["Ticket ID", "Site Name", "Hours", "Visits"],
            &[
                &[
                    ("Ticket ID", " T1 "),
                    ("Site Name", "Alpha"),
                    ("Hours", "12,5"),
                    ("Visits", "2"),
                ],
                &[
                    ("Ticket ID", "T3"),
                    ("Site Name", "Gamma"),
                    ("Hours", "8"),
                    ("Visits", "1"),
                ],
            ],
        );
        (reported, billable)
    }

    #[test]
    fn deviation_for_matched_ticket() {
        let (reported, billable) = sample_tables();
        let cmp = compare_ticket("T1", &reported, &billable, &[]);

        assert!(cmp.in_reported);
        assert!(cmp.in_billable);
        assert_eq!(cmp.site, "Alpha");

        let hours = cmp.entries.iter().find(|e| e.field == "Hours").unwrap();
        assert_eq!(hours.reported, "10");
        assert_eq!(hours.billable, "12,5");
        assert_eq!(hours.deviation, Some(2.5));

        let visits = cmp.entries.iter().find(|e| e.field == "Visits").unwrap();
        assert_eq!(visits.deviation, Some(0.0));
    }

    #[test]
    fn billable_only_ticket_resolves_site_from_billable() {
        let (reported, billable) = sample_tables();
        let cmp = compare_ticket("T3", &reported, &billable, &[]);

        assert!(!cmp.in_reported);
        assert!(cmp.in_billable);
        assert_eq!(cmp.site, "Gamma");

        let hours = cmp.entries.iter().find(|e| e.field == "Hours").unwrap();
        assert_eq!(hours.reported, "");
        assert_eq!(hours.billable, "8");
        // Missing side reads as 0
        assert_eq!(hours.deviation, Some(8.0));
    }

    #[test]
    fn both_sides_non_numeric_is_blank_not_zero() {
        let (reported, billable) = sample_tables();
        // T2 exists only in reported, with empty Visits
        let cmp = compare_ticket("T2", &reported, &billable, &[]);

        let visits = cmp.entries.iter().find(|e| e.field == "Visits").unwrap();
        assert!(visits.comparable);
        assert_eq!(visits.deviation, None);
    }

    #[test]
    fn non_comparable_field_included_only_when_non_blank() {
        let (reported, billable) = sample_tables();

        let t1 = compare_ticket("T1", &reported, &billable, &[]);
        let remarks = t1.entries.iter().find(|e| e.field == "Remarks").unwrap();
        assert!(!remarks.comparable);
        assert_eq!(remarks.deviation, None);
        assert_eq!(remarks.reported, "first pass");

        // T2 has a blank remark on its only side: the entry is omitted
        let t2 = compare_ticket("T2", &reported, &billable, &[]);
        assert!(t2.entries.iter().all(|e| e.field != "Remarks"));
    }

    #[test]
    fn unmatched_ticket_is_flagged_not_an_error() {
        let (reported, billable) = sample_tables();
        let cmp = compare_ticket("T99", &reported, &billable, &[]);

        assert!(cmp.is_unmatched());
        assert_eq!(cmp.site, "");
        assert!(cmp.entries.iter().all(|e| e.deviation.is_none()));
    }

    #[test]
    fn duplicate_ids_first_match_wins_and_counts() {
        let reported = table(
            &["Ticket ID", "Site Name", "Hours"],
            &[
                &[("Ticket ID", "T1"), ("Site Name", "Alpha"), ("Hours", "3")],
                &[("Ticket ID", "T1"), ("Site Name", "Beta"), ("Hours", "9")],
            ],
        );
        let billable = table(&["Ticket ID", "Site Name", "Hours"], &[]);

        let cmp = compare_ticket("T1", &reported, &billable, &[]);
        assert_eq!(cmp.site, "Alpha");
        assert_eq!(cmp.duplicates_reported, 1);
        assert_eq!(cmp.duplicates_billable, 0);

        let hours = cmp.entries.iter().find(|e| e.field == "Hours").unwrap();
        assert_eq!(hours.reported, "3");
    }

    #[test]
    fn matching_trims_both_sides() {
        let (reported, billable) = sample_tables();
        // billable stores " T1 " — the requested "  T1 " still matches
        let cmp = compare_ticket("  T1 ", &reported, &billable, &[]);
        assert!(cmp.in_billable);
        assert_eq!(cmp.ticket, "T1");
    }
}
