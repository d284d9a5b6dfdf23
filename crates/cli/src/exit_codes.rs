//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — cron jobs and wrapper scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Success                                       |
//! | 1       | Universal | General error (unspecified)                   |
//! | 2       | Universal | CLI usage error (bad args, missing option)    |
//! | 3-9     | compare   | Reconciliation lookup codes                   |
//! | 10-19   | config    | Configuration file codes                      |
//! | 50-59   | fetch     | Source fetch codes (--strict-sources only)    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use tickrec_config::ConfigError;
use tickrec_fetch::FetchError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Compare (3-9)
// =============================================================================

/// Requested ticket id appears in neither source.
pub const EXIT_NO_MATCH: u8 = 3;

// =============================================================================
// Config (10-19)
// =============================================================================

/// Config file cannot be read (missing, permissions).
pub const EXIT_CONFIG_IO: u8 = 10;

/// Config file is not valid TOML / does not match the schema.
pub const EXIT_CONFIG_PARSE: u8 = 11;

/// Config parsed but failed semantic validation (e.g. a source with
/// both url and file set).
pub const EXIT_CONFIG_INVALID: u8 = 12;

// =============================================================================
// Fetch (50-59)
//
// A failed source normally degrades to an empty table; these codes fire
// only under --strict-sources.
// =============================================================================

/// Network failure or timeout after retries.
pub const EXIT_FETCH_NETWORK: u8 = 50;

/// Upstream returned a non-success HTTP status.
pub const EXIT_FETCH_HTTP: u8 = 51;

/// Local source file cannot be read.
pub const EXIT_FETCH_IO: u8 = 52;

/// Response exceeded the size cap.
pub const EXIT_FETCH_TOO_LARGE: u8 = 53;

// =============================================================================
// Error-to-code mapping
// =============================================================================

/// Map a ConfigError to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Io(_) => EXIT_CONFIG_IO,
        ConfigError::Parse(_) => EXIT_CONFIG_PARSE,
        ConfigError::Validation(_) => EXIT_CONFIG_INVALID,
    }
}

/// Map a FetchError to its exit code (strict-sources mode).
pub fn fetch_exit_code(err: &FetchError) -> u8 {
    match err {
        FetchError::Network(_) => EXIT_FETCH_NETWORK,
        FetchError::Http { .. } => EXIT_FETCH_HTTP,
        FetchError::Io(_) => EXIT_FETCH_IO,
        FetchError::TooLarge { .. } => EXIT_FETCH_TOO_LARGE,
        FetchError::InvalidUrl(_) => EXIT_CONFIG_INVALID,
        FetchError::Client(_) => EXIT_ERROR,
    }
}
