//! `tickrec-recon` — reported-vs-billable reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns comparisons and
//! deviation reports. No CLI, network, or file IO dependencies.

pub mod compare;
pub mod fields;
pub mod model;
pub mod numeric;
pub mod report;

pub use compare::compare_ticket;
pub use fields::{comparable_fields, site_names, ticket_ids};
pub use model::{DeviationReport, FieldEntry, Table, TicketComparison};
pub use numeric::parse_number;
pub use report::build_report;
