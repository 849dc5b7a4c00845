//! Utility functions for date parsing, selectors, log formatting, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Watermark parsing for the `--until` argument
//! - Tolerant CSS selector compilation for profile-driven markup lookups
//! - String truncation for logging
//! - File system validation for the CSV store and log file
//! - Racing a run against an interrupt signal

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use scraper::Selector;
use std::error::Error;
use std::fs as stdfs;
use std::future::Future;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

const UNTIL_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse the crawl watermark.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS]`, the same with a `T` separator, or a bare
/// date meaning midnight. Times are the site's local time, like the article
/// stamps they are compared against.
///
/// # Examples
///
/// ```ignore
/// assert!(parse_until("2025-11-17 00:00").is_ok());
/// assert!(parse_until("2025-11-17").is_ok());
/// ```
pub fn parse_until(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    for fmt in UNTIL_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            format!("could not parse '{raw}' as a date/time (expected e.g. \"2025-11-17 00:00\")")
        })
}

static MATCH_NOTHING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("x-match-nothing").expect("static selector is valid"));

/// Compile a profile selector. An invalid one matches nothing and is logged.
pub fn parse_selector(css: &str) -> Selector {
    match Selector::parse(css) {
        Ok(sel) => sel,
        Err(e) => {
            warn!(selector = %css, error = ?e, "Invalid selector; it will match nothing");
            MATCH_NOTHING.clone()
        }
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended. Cuts always fall on a character boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure the parent directory of `path` exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_parent(path: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;

    let probe_path = dir.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!(dir = %dir.display(), "Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Drive `work` until it finishes or `interrupt` fires. `None` means interrupted.
///
/// If the interrupt source itself fails, `work` is run to completion.
pub async fn until_interrupted<W, I>(work: W, interrupt: I) -> Option<W::Output>
where
    W: Future,
    I: Future<Output = io::Result<()>>,
{
    tokio::pin!(work);
    let signal = tokio::select! {
        out = &mut work => return Some(out),
        res = interrupt => res,
    };
    match signal {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "Cannot listen for interrupts; running to completion");
            Some(work.await)
        }
    }
}
