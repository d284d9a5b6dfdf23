//! Source loading: config entry -> fetched text -> parsed table.
//!
//! A source that cannot be fetched or parsed degrades to an empty table
//! (warn-logged, noted on stderr) so a one-sided outage still produces
//! a report. `--strict-sources` turns fetch failures into hard errors
//! with codes from the fetch range of the exit-code registry.

use tickrec_config::{Config, SourceConfig};
use tickrec_fetch::{Source, SourceClient};
use tickrec_io::parse_table;
use tickrec_recon::Table;

use crate::exit_codes::fetch_exit_code;
use crate::CliError;

pub struct LoadOptions {
    pub strict: bool,
    pub quiet: bool,
}

/// Load both sources named in the config, in reported/billable order.
pub fn load_sources(config: &Config, opts: &LoadOptions) -> Result<(Table, Table), CliError> {
    let client = SourceClient::new(config.fetch.timeout_secs)
        .map_err(|e| CliError::fetch("client", &e))?;

    let reported = load_one("reported", &config.sources.reported, &client, opts)?;
    let billable = load_one("billable", &config.sources.billable, &client, opts)?;
    Ok((reported, billable))
}

fn load_one(
    name: &str,
    spec: &SourceConfig,
    client: &SourceClient,
    opts: &LoadOptions,
) -> Result<Table, CliError> {
    let source = source_of(spec)?;

    let text = match client.fetch_csv(&source) {
        Ok(text) => text,
        Err(e) if opts.strict => {
            return Err(CliError::fetch(name, &e)
                .with_hint("drop --strict-sources to continue with an empty table"));
        }
        Err(e) => {
            log::warn!("{name} source unavailable, continuing with empty table: {e}");
            if !opts.quiet {
                eprintln!("note: {name} source unavailable ({e}); treating as empty");
            }
            return Ok(Table::empty());
        }
    };

    match parse_table(&text) {
        Ok(outcome) => {
            if outcome.dropped_rows > 0 && !opts.quiet {
                eprintln!(
                    "note: {name} source parsed with {} strategy; {} malformed rows dropped",
                    outcome.strategy, outcome.dropped_rows
                );
            }
            Ok(outcome.table)
        }
        Err(e) => {
            log::warn!("{name} source unparseable, continuing with empty table: {e}");
            if !opts.quiet {
                eprintln!("note: {name} source unparseable ({e}); treating as empty");
            }
            Ok(Table::empty())
        }
    }
}

/// Config validation guarantees exactly one of url/file, but the mapping
/// stays total rather than panicking on a hand-built `SourceConfig`.
fn source_of(spec: &SourceConfig) -> Result<Source, CliError> {
    match (&spec.url, &spec.file) {
        (Some(url), None) => Ok(Source::Url(url.clone())),
        (None, Some(path)) => Ok(Source::File(path.clone())),
        _ => Err(CliError::args("source must set exactly one of url or file")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn file_spec(path: PathBuf) -> SourceConfig {
        SourceConfig {
            url: None,
            file: Some(path),
        }
    }

    #[test]
    fn source_mapping_prefers_exactly_one_location() {
        let spec = SourceConfig {
            url: Some("https://example.com/a.csv".into()),
            file: None,
        };
        assert!(matches!(source_of(&spec).unwrap(), Source::Url(_)));

        let spec = SourceConfig {
            url: None,
            file: None,
        };
        assert!(source_of(&spec).is_err());
    }

    #[test]
    fn missing_file_degrades_to_empty_table() {
        let client = SourceClient::new(1).unwrap();
        let opts = LoadOptions {
            strict: false,
            quiet: true,
        };
        let spec = file_spec(PathBuf::from("/nonexistent/tickets.csv"));

        let table = load_one("reported", &spec, &client, &opts).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn missing_file_is_fatal_under_strict_sources() {
        let client = SourceClient::new(1).unwrap();
        let opts = LoadOptions {
            strict: true,
            quiet: true,
        };
        let spec = file_spec(PathBuf::from("/nonexistent/tickets.csv"));

        let err = load_one("reported", &spec, &client, &opts).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_FETCH_IO);
    }

    #[test]
    fn local_csv_file_loads() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "Ticket ID,Quantity").unwrap();
        writeln!(tmp, "FT-1,4").unwrap();

        let client = SourceClient::new(1).unwrap();
        let opts = LoadOptions {
            strict: true,
            quiet: true,
        };
        let table = load_one("reported", &file_spec(tmp.path().to_path_buf()), &client, &opts)
            .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table.has_column("Quantity"));
    }
}
