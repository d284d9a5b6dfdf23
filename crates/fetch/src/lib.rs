//! `tickrec-fetch` — pull source CSV text from a URL or local file.
//!
//! Blocking reqwest client (no Tokio runtime required). Published
//! spreadsheet exports are unauthenticated GETs that redirect at least
//! once, so redirects are followed; responses are size-capped and
//! 429/5xx/network failures are retried with exponential backoff.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

// ── Constants ───────────────────────────────────────────────────────

const MAX_RETRIES: u32 = 3;
const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024; // 10 MB
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const USER_AGENT: &str = concat!("tickrec/", env!("CARGO_PKG_VERSION"));

// ── Source ──────────────────────────────────────────────────────────

/// Where a source table comes from. Local files exist for offline runs
/// and tests; production sources are published-CSV URLs.
#[derive(Debug, Clone)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum FetchError {
    /// Not an http(s) URL.
    InvalidUrl(String),
    /// Connection / timeout failure after all retries.
    Network(String),
    /// Non-retryable HTTP status, or a retryable one after all retries.
    Http { status: u16, message: String },
    /// Response exceeded the size cap.
    TooLarge { bytes: usize, max: usize },
    /// Local file read failure.
    Io(String),
    /// Client construction failure.
    Client(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(url) => write!(f, "not an http(s) URL: {url}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::TooLarge { bytes, max } => {
                write!(f, "response too large ({bytes} bytes, max {max})")
            }
            Self::Io(msg) => write!(f, "cannot read source file: {msg}"),
            Self::Client(msg) => write!(f, "cannot build HTTP client: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

// ── Client ──────────────────────────────────────────────────────────

/// Blocking fetcher for source CSVs, one per command invocation.
pub struct SourceClient {
    http: reqwest::blocking::Client,
}

impl SourceClient {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    /// Fetch the raw CSV text of a source.
    pub fn fetch_csv(&self, source: &Source) -> Result<String, FetchError> {
        match source {
            Source::Url(url) => self.fetch_url(url),
            Source::File(path) => {
                tickrec_io::read_file_as_utf8(path).map_err(|e| FetchError::Io(e.to_string()))
            }
        }
    }

    /// GET with retry + exponential backoff on 429/5xx/network errors.
    /// Other 4xx statuses fail immediately — a published sheet that
    /// answers 404 will not start answering 200 one second later.
    fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut backoff_secs = 1u64;

        for attempt in 0..=MAX_RETRIES {
            match self.http.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status >= 400 && status < 500 && status != 429 {
                        return Err(FetchError::Http {
                            status,
                            message: resp.text().unwrap_or_default().chars().take(200).collect(),
                        });
                    }

                    if status == 429 || status >= 500 {
                        if attempt == MAX_RETRIES {
                            return Err(FetchError::Http {
                                status,
                                message: format!("still failing after {MAX_RETRIES} retries"),
                            });
                        }
                        // Respect Retry-After for 429
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .unwrap_or(backoff_secs)
                        } else {
                            backoff_secs
                        };
                        log::warn!(
                            "retry {}/{} in {}s (HTTP {})",
                            attempt + 1,
                            MAX_RETRIES,
                            wait,
                            status
                        );
                        thread::sleep(Duration::from_secs(wait));
                        backoff_secs *= 2;
                        continue;
                    }

                    // Success: size-cap, then strip a BOM if present
                    if let Some(len) = resp.content_length() {
                        if len as usize > MAX_RESPONSE_BYTES {
                            return Err(FetchError::TooLarge {
                                bytes: len as usize,
                                max: MAX_RESPONSE_BYTES,
                            });
                        }
                    }
                    let text = resp.text().map_err(|e| FetchError::Network(e.to_string()))?;
                    if text.len() > MAX_RESPONSE_BYTES {
                        return Err(FetchError::TooLarge {
                            bytes: text.len(),
                            max: MAX_RESPONSE_BYTES,
                        });
                    }
                    return Ok(text.trim_start_matches('\u{feff}').to_string());
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(FetchError::Network(format!(
                            "{e} (after {MAX_RETRIES} retries)"
                        )));
                    }
                    log::warn!("retry {}/{} in {}s ({e})", attempt + 1, MAX_RETRIES, backoff_secs);
                    thread::sleep(Duration::from_secs(backoff_secs));
                    backoff_secs *= 2;
                }
            }
        }

        unreachable!("retry loop always returns")
    }
}
