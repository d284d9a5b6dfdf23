//! Bulk reconciler: outer-join both tables on ticket id and compute one
//! deviation column per comparable field.

use std::collections::BTreeMap;

use crate::fields::comparable_fields;
use crate::model::{
    DeviationReport, Record, ReportRow, ReportSummary, Table, SITE_NAME,
};
use crate::numeric::parse_number;

/// Build the full deviation report.
///
/// One output row per distinct non-blank trimmed ticket id across both
/// tables, ordered lexicographically. A row missing from one side reads
/// as 0.0 for every comparable field on that side. `site_filter`, when
/// given, keeps only rows whose resolved site matches it exactly (after
/// trimming); resolution prefers the reported side.
pub fn build_report(
    reported: &Table,
    billable: &Table,
    site_filter: Option<&str>,
    extra_exclusions: &[String],
) -> DeviationReport {
    let fields = comparable_fields(reported, billable, extra_exclusions);

    let reported_index = index_by_ticket(reported);
    let billable_index = index_by_ticket(billable);

    // Outer union of join keys; BTreeMap keys are already sorted
    let mut tickets: Vec<&str> = reported_index.keys().copied().collect();
    for key in billable_index.keys() {
        if !reported_index.contains_key(key) {
            tickets.push(*key);
        }
    }
    tickets.sort_unstable();

    let mut matched = 0;
    let mut reported_only = 0;
    let mut billable_only = 0;

    let mut rows = Vec::with_capacity(tickets.len());
    for ticket in &tickets {
        let left = reported_index.get(ticket).map(|e| e.row);
        let right = billable_index.get(ticket).map(|e| e.row);
        match (left, right) {
            (Some(_), Some(_)) => matched += 1,
            (Some(_), None) => reported_only += 1,
            (None, Some(_)) => billable_only += 1,
            (None, None) => unreachable!(),
        }

        let site = resolve_site(reported, left, billable, right);
        if let Some(wanted) = site_filter {
            if site != wanted.trim() {
                continue;
            }
        }

        let deviations = fields
            .iter()
            .map(|field| {
                let r = numeric_value(reported, left, field);
                let b = numeric_value(billable, right, field);
                b - r
            })
            .collect();

        rows.push(ReportRow {
            ticket: ticket.to_string(),
            site,
            deviations,
        });
    }

    let mut columns = vec!["Ticket ID".to_string(), "Site".to_string()];
    columns.extend(fields.iter().cloned());

    DeviationReport {
        columns,
        rows,
        summary: ReportSummary {
            reported_rows: reported.rows.len(),
            billable_rows: billable.rows.len(),
            tickets: tickets.len(),
            matched,
            reported_only,
            billable_only,
            duplicate_tickets_reported: duplicate_count(&reported_index),
            duplicate_tickets_billable: duplicate_count(&billable_index),
        },
        fields,
    }
}

struct TicketEntry<'a> {
    row: &'a Record,
    count: usize,
}

/// First row per distinct non-blank trimmed ticket id, with occurrence
/// counts so duplicate keys stay observable.
fn index_by_ticket(table: &Table) -> BTreeMap<&str, TicketEntry<'_>> {
    let mut index: BTreeMap<&str, TicketEntry<'_>> = BTreeMap::new();
    for row in &table.rows {
        let ticket = table.ticket_id(row);
        if ticket.is_empty() {
            continue;
        }
        index
            .entry(ticket)
            .and_modify(|e| e.count += 1)
            .or_insert(TicketEntry { row, count: 1 });
    }
    index
}

fn duplicate_count(index: &BTreeMap<&str, TicketEntry<'_>>) -> usize {
    index.values().map(|e| e.count - 1).sum()
}

/// Missing row or non-numeric value both read as 0.0 in the bulk view.
fn numeric_value(table: &Table, row: Option<&Record>, field: &str) -> f64 {
    row.and_then(|r| parse_number(table.value(r, field)))
        .unwrap_or(0.0)
}

fn resolve_site(
    reported: &Table,
    left: Option<&Record>,
    billable: &Table,
    right: Option<&Record>,
) -> String {
    let from_reported = left
        .map(|r| reported.value(r, SITE_NAME).trim())
        .unwrap_or("");
    if !from_reported.is_empty() {
        return from_reported.to_string();
    }
    right
        .map(|r| billable.value(r, SITE_NAME).trim())
        .unwrap_or("")
        .to_string()
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
            &["Ticket ID", "Site Name", "Hours", "Visits"],
            &[
                &[
                    ("Ticket ID", "T1"),
                    ("Site Name", "Alpha"),
                    ("Hours", "10"),
                    ("Visits", "2"),
                ],
                &[
                    ("Ticket ID", "T2"),
                    ("Site Name", "Beta"),
                    ("Hours", "4"),
                    ("Visits", "1"),
                ],
            ],
        );
        let billable = table(
            &["Ticket ID", "Site Name", "Hours", "Visits"],
            &[
                &[
                    ("Ticket ID", "T1"),
                    ("Site Name", "Alpha"),
                    ("Hours", "12,5"),
                    ("Visits", "2"),
                ],
                &[
                    ("Ticket ID", "T3"),
                    ("Site Name", "Gamma"),
                    ("Hours", "6"),
                    ("Visits", "1"),
                ],
            ],
        );
        (reported, billable)
    }

    #[test]
    fn outer_join_cardinality() {
        let (reported, billable) = sample_tables();
        let report = build_report(&reported, &billable, None, &[]);

        assert_eq!(report.summary.tickets, 3);
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.summary.matched, 1);
        assert_eq!(report.summary.reported_only, 1);
        assert_eq!(report.summary.billable_only, 1);
    }

    #[test]
    fn deviations_per_field() {
        let (reported, billable) = sample_tables();
        let report = build_report(&reported, &billable, None, &[]);

        assert_eq!(report.fields, vec!["Hours", "Visits"]);
        assert_eq!(
            report.columns,
            vec!["Ticket ID", "Site", "Hours", "Visits"]
        );

        // Rows come back sorted by ticket id
        let t1 = &report.rows[0];
        assert_eq!(t1.ticket, "T1");
        assert_eq!(t1.deviations, vec![2.5, 0.0]);

        // Reported-only: billable side reads 0
        let t2 = &report.rows[1];
        assert_eq!(t2.ticket, "T2");
        assert_eq!(t2.deviations, vec![-4.0, -1.0]);

        // Billable-only: reported side reads 0
        let t3 = &report.rows[2];
        assert_eq!(t3.ticket, "T3");
        assert_eq!(t3.site, "Gamma");
        assert_eq!(t3.deviations, vec![6.0, 1.0]);
    }

    #[test]
    fn site_filter_prefers_reported_side() {
        let (reported, billable) = sample_tables();

        let alpha = build_report(&reported, &billable, Some("Alpha"), &[]);
        assert_eq!(alpha.rows.len(), 1);
        assert_eq!(alpha.rows[0].ticket, "T1");

        // Billable-only rows resolve their site from the billable side
        let gamma = build_report(&reported, &billable, Some("Gamma"), &[]);
        assert_eq!(gamma.rows.len(), 1);
        assert_eq!(gamma.rows[0].ticket, "T3");

        // The filter narrows rows, not the join itself
        assert_eq!(gamma.summary.tickets, 3);
    }

    #[test]
    fn blank_ticket_ids_are_skipped() {
        let reported = table(
            &["Ticket ID", "Site Name", "Hours"],
            &[
                &[("Ticket ID", ""), ("Site Name", "Alpha"), ("Hours", "5")],
                &[("Ticket ID", "  "), ("Site Name", "Beta"), ("Hours", "1")],
                &[("Ticket ID", "T1"), ("Site Name", "Alpha"), ("Hours", "2")],
            ],
        );
        let billable = table(&["Ticket ID", "Site Name", "Hours"], &[]);

        let report = build_report(&reported, &billable, None, &[]);
        assert_eq!(report.summary.tickets, 1);
        assert_eq!(report.rows[0].ticket, "T1");
    }

    #[test]
    fn missing_ticket_column_yields_no_rows() {
        let reported = table(
            &["Site Name", "Hours"],
            &[&[("Site Name", "Alpha"), ("Hours", "5")]],
        );
        let billable = table(
            &["Ticket ID", "Site Name", "Hours"],
            &[&[("Ticket ID", "T1"), ("Site Name", "Beta"), ("Hours", "3")]],
        );

        let report = build_report(&reported, &billable, None, &[]);
        assert_eq!(report.summary.tickets, 1);
        assert_eq!(report.rows[0].ticket, "T1");
        assert_eq!(report.summary.reported_rows, 1);
    }

    #[test]
    fn duplicate_tickets_counted_first_row_wins() {
        let reported = table(
            &["Ticket ID", "Site Name", "Hours"],
            &[
                &[("Ticket ID", "T1"), ("Site Name", "Alpha"), ("Hours", "3")],
                &[("Ticket ID", "T1"), ("Site Name", "Alpha"), ("Hours", "9")],
            ],
        );
        let billable = table(
            &["Ticket ID", "Site Name", "Hours"],
            &[&[("Ticket ID", "T1"), ("Site Name", "Alpha"), ("Hours", "4")]],
        );

        let report = build_report(&reported, &billable, None, &[]);
        assert_eq!(report.summary.duplicate_tickets_reported, 1);
        assert_eq!(report.summary.duplicate_tickets_billable, 0);
        // First reported row (Hours=3) is the join side: 4 - 3
        assert_eq!(report.rows[0].deviations, vec![1.0]);
    }
}
