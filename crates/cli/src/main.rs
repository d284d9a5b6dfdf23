// tickrec - reconcile reported vs billable field-service tickets

mod exit_codes;
mod sources;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tickrec_config::{Config, ConfigError, SourceConfig};
use tickrec_fetch::FetchError;
use tickrec_recon::{
    build_report, comparable_fields, compare_ticket, site_names, ticket_ids, DeviationReport,
    Table, TicketComparison,
};

use exit_codes::{
    config_exit_code, fetch_exit_code, EXIT_ERROR, EXIT_NO_MATCH, EXIT_SUCCESS, EXIT_USAGE,
};
use sources::{load_sources, LoadOptions};

#[derive(Parser)]
#[command(name = "tickrec")]
#[command(about = "Reconcile reported vs billable ticket exports by Ticket ID")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads the two sources.
#[derive(Args)]
struct SourceArgs {
    /// Config file naming the reported/billable sources
    #[arg(long, env = "TICKREC_CONFIG", value_name = "FILE")]
    config: PathBuf,

    /// Fail on a fetch error instead of treating the source as empty
    #[arg(long)]
    strict_sources: bool,

    /// Suppress stderr notes (empty sources, dropped rows, duplicates)
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one ticket across both sources, field by field
    #[command(after_help = "\
Exit code 3 means the ticket id appears in neither source.

Examples:
  tickrec compare --config tickrec.toml --ticket FT-102
  tickrec compare --ticket FT-102 --json
  TICKREC_CONFIG=tickrec.toml tickrec compare --ticket FT-102")]
    Compare {
        #[command(flatten)]
        sources: SourceArgs,

        /// Ticket ID to look up (matched exactly after trimming)
        #[arg(long)]
        ticket: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the full deviation report (outer join on Ticket ID)
    #[command(after_help = "\
Examples:
  tickrec report --config tickrec.toml
  tickrec report --site 'Delhi NCR'
  tickrec report --out json
  tickrec report --output deviations.csv")]
    Report {
        #[command(flatten)]
        sources: SourceArgs,

        /// Keep only tickets whose resolved site matches exactly
        #[arg(long)]
        site: Option<String>,

        /// Output format
        #[arg(long, alias = "format", default_value = "csv")]
        out: ReportFormat,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List site names present in either source
    Sites {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List ticket ids present in either source
    Tickets {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the comparable (shared, non-excluded) columns
    Fields {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a config file without fetching anything
    #[command(after_help = "\
Examples:
  tickrec validate tickrec.toml
  tickrec validate tickrec.toml --json")]
    Validate {
        /// Config file to check
        config: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Csv,
    Json,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compare {
            sources,
            ticket,
            json,
        } => cmd_compare(sources, ticket, json),
        Commands::Report {
            sources,
            site,
            out,
            output,
        } => cmd_report(sources, site, out, output),
        Commands::Sites { sources, json } => cmd_sites(sources, json),
        Commands::Tickets { sources, json } => cmd_tickets(sources, json),
        Commands::Fields { sources, json } => cmd_fields(sources, json),
        Commands::Validate { config, json } => cmd_validate(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn config(err: ConfigError) -> Self {
        Self {
            code: config_exit_code(&err),
            message: err.to_string(),
            hint: None,
        }
    }

    pub fn fetch(source: &str, err: &FetchError) -> Self {
        Self {
            code: fetch_exit_code(err),
            message: format!("{source} source: {err}"),
            hint: None,
        }
    }

    pub fn no_match(ticket: &str) -> Self {
        Self {
            code: EXIT_NO_MATCH,
            message: format!("ticket {:?} not found in either source", ticket),
            hint: Some("run `tickrec tickets` to list known ticket ids".to_string()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// compare
// ============================================================================

fn cmd_compare(args: SourceArgs, ticket: String, json: bool) -> Result<(), CliError> {
    let config = Config::from_path(&args.config).map_err(CliError::config)?;
    let (reported, billable) = load_sources(&config, &load_options(&args))?;

    let cmp = compare_ticket(&ticket, &reported, &billable, &config.fields.exclude);
    if cmp.is_unmatched() {
        return Err(CliError::no_match(&ticket));
    }

    if !args.quiet {
        note_duplicates("reported", cmp.duplicates_reported, &cmp.ticket);
        note_duplicates("billable", cmp.duplicates_billable, &cmp.ticket);
    }

    if json {
        print_json(&cmp)
    } else {
        print_str(&render_comparison(&cmp))
    }
}

fn note_duplicates(side: &str, surplus: usize, ticket: &str) {
    if surplus > 0 {
        eprintln!(
            "note: {} extra {} row(s) share ticket id {:?} (first match used)",
            surplus, side, ticket
        );
    }
}

fn render_comparison(cmp: &TicketComparison) -> String {
    let site = if cmp.site.is_empty() {
        "(unknown)"
    } else {
        cmp.site.as_str()
    };

    let mut out = String::new();
    out.push_str(&format!("Ticket {}  site: {}\n", cmp.ticket, site));
    out.push_str(&format!(
        "present in: reported={} billable={}\n\n",
        yes_no(cmp.in_reported),
        yes_no(cmp.in_billable)
    ));
    out.push_str(&format!(
        "{:<28} {:>14} {:>14} {:>12}\n",
        "field", "reported", "billable", "deviation"
    ));
    for entry in &cmp.entries {
        let deviation = entry
            .deviation
            .map(|d| d.to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{:<28} {:>14} {:>14} {:>12}\n",
            entry.field, entry.reported, entry.billable, deviation
        ));
    }
    out
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

// ============================================================================
// report
// ============================================================================

fn cmd_report(
    args: SourceArgs,
    site: Option<String>,
    out: ReportFormat,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = Config::from_path(&args.config).map_err(CliError::config)?;
    let (reported, billable) = load_sources(&config, &load_options(&args))?;

    let report = build_report(
        &reported,
        &billable,
        site.as_deref(),
        &config.fields.exclude,
    );

    if !args.quiet {
        let s = &report.summary;
        eprintln!(
            "note: {} tickets ({} matched, {} reported-only, {} billable-only)",
            s.tickets, s.matched, s.reported_only, s.billable_only
        );
        if s.duplicate_tickets_reported > 0 || s.duplicate_tickets_billable > 0 {
            eprintln!(
                "note: duplicate ticket ids: {} reported, {} billable (first match used)",
                s.duplicate_tickets_reported, s.duplicate_tickets_billable
            );
        }
    }

    let bytes = match out {
        ReportFormat::Csv => report_to_csv(&report)?,
        ReportFormat::Json => {
            let mut bytes = serde_json::to_vec_pretty(&report)
                .map_err(|e| CliError::io(e.to_string()))?;
            bytes.push(b'\n');
            bytes
        }
    };

    match output {
        Some(path) => std::fs::write(&path, &bytes)
            .map_err(|e| CliError::io(format!("{}: {}", path.display(), e))),
        None => io::stdout()
            .write_all(&bytes)
            .map_err(|e| CliError::io(e.to_string())),
    }
}

fn report_to_csv(report: &DeviationReport) -> Result<Vec<u8>, CliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&report.columns)
        .map_err(|e| CliError::io(e.to_string()))?;

    for row in &report.rows {
        let mut record: Vec<String> = Vec::with_capacity(report.columns.len());
        record.push(row.ticket.clone());
        record.push(row.site.clone());
        for deviation in &row.deviations {
            record.push(deviation.to_string());
        }
        writer
            .write_record(&record)
            .map_err(|e| CliError::io(e.to_string()))?;
    }

    writer.into_inner().map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// discovery: sites / tickets / fields
// ============================================================================

fn cmd_sites(args: SourceArgs, json: bool) -> Result<(), CliError> {
    let (reported, billable) = load_for_discovery(&args)?;
    print_list(&site_names(&[&reported, &billable]), json)
}

fn cmd_tickets(args: SourceArgs, json: bool) -> Result<(), CliError> {
    let (reported, billable) = load_for_discovery(&args)?;
    print_list(&ticket_ids(&[&reported, &billable]), json)
}

fn cmd_fields(args: SourceArgs, json: bool) -> Result<(), CliError> {
    let config = Config::from_path(&args.config).map_err(CliError::config)?;
    let (reported, billable) = load_sources(&config, &load_options(&args))?;
    print_list(
        &comparable_fields(&reported, &billable, &config.fields.exclude),
        json,
    )
}

fn load_for_discovery(args: &SourceArgs) -> Result<(Table, Table), CliError> {
    let config = Config::from_path(&args.config).map_err(CliError::config)?;
    load_sources(&config, &load_options(args))
}

fn load_options(args: &SourceArgs) -> LoadOptions {
    LoadOptions {
        strict: args.strict_sources,
        quiet: args.quiet,
    }
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(path: PathBuf, json: bool) -> Result<(), CliError> {
    let config = Config::from_path(&path).map_err(CliError::config)?;

    if json {
        print_json(&serde_json::json!({
            "ok": true,
            "name": config.name,
            "reported": describe_source(&config.sources.reported),
            "billable": describe_source(&config.sources.billable),
            "timeout_secs": config.fetch.timeout_secs,
            "extra_exclusions": config.fields.exclude,
        }))
    } else {
        let mut out = String::from("config ok\n");
        if let Some(name) = &config.name {
            out.push_str(&format!("  name:     {}\n", name));
        }
        out.push_str(&format!(
            "  reported: {}\n",
            describe_source(&config.sources.reported)
        ));
        out.push_str(&format!(
            "  billable: {}\n",
            describe_source(&config.sources.billable)
        ));
        out.push_str(&format!("  timeout:  {}s\n", config.fetch.timeout_secs));
        if !config.fields.exclude.is_empty() {
            out.push_str(&format!(
                "  excluded: {}\n",
                config.fields.exclude.join(", ")
            ));
        }
        print_str(&out)
    }
}

fn describe_source(spec: &SourceConfig) -> String {
    match (&spec.url, &spec.file) {
        (Some(url), _) => url.clone(),
        (_, Some(path)) => path.display().to_string(),
        (None, None) => "(unset)".to_string(),
    }
}

// ============================================================================
// output helpers
// ============================================================================

fn print_list(items: &[String], json: bool) -> Result<(), CliError> {
    if json {
        return print_json(&items);
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for item in items {
        writeln!(handle, "{}", item).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_str(text: &str) -> Result<(), CliError> {
    io::stdout()
        .write_all(text.as_bytes())
        .map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tickrec_recon::Table;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_tables() -> (Table, Table) {
        let reported = Table::new(
            vec![
                "Ticket ID".into(),
                "Site Name".into(),
                "Quantity".into(),
            ],
            vec![row(&[
                ("Ticket ID", "FT-1"),
                ("Site Name", "Pune"),
                ("Quantity", "4"),
            ])],
        );
        let billable = Table::new(
            vec!["Ticket ID".into(), "Quantity".into()],
            vec![row(&[("Ticket ID", "FT-1"), ("Quantity", "5")])],
        );
        (reported, billable)
    }

    #[test]
    fn comparison_rendering_includes_deviation() {
        let (reported, billable) = sample_tables();
        let cmp = compare_ticket("FT-1", &reported, &billable, &[]);
        let text = render_comparison(&cmp);

        assert!(text.contains("Ticket FT-1"));
        assert!(text.contains("site: Pune"));
        assert!(text.contains("Quantity"));
        assert!(text.contains('1'), "deviation 5-4 should appear");
    }

    #[test]
    fn report_csv_has_header_and_one_row_per_ticket() {
        let (reported, billable) = sample_tables();
        let report = build_report(&reported, &billable, None, &[]);
        let bytes = report_to_csv(&report).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Ticket ID,Site,Quantity");
        assert_eq!(lines[1], "FT-1,Pune,1");
    }

    #[test]
    fn unmatched_ticket_maps_to_no_match_exit_code() {
        let err = CliError::no_match("FT-999");
        assert_eq!(err.code, EXIT_NO_MATCH);
        assert!(err.message.contains("FT-999"));
    }
}
