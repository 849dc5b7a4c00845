//! Error taxonomy for the notification crawler.
//!
//! Errors are layered the same way the pipeline is:
//! - [`BrowserError`]: the rendering engine itself misbehaved
//! - [`ExtractionError`]: an article page rendered but a required field was missing
//! - [`StoreError`]: the CSV store could not be read or written
//! - [`ScrapeError`]: what the crawl loop sees, carrying the URL or selector involved
//!
//! Per-article failures are contained by the retry wrapper in [`crate::fetch`];
//! only initialization failures and store failures reach `main`.

use std::time::Duration;
use thiserror::Error;

/// Failures raised by the browser capability layer.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("devtools protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("unexpected script result: {0}")]
    Script(#[from] serde_json::Error),

    #[error("page not available: {0}")]
    Unavailable(String),
}

/// A rendered article page lacked a field we cannot do without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no primary heading found")]
    MissingTitle,

    #[error("publish date missing or unparsable")]
    MissingDate,

    #[error("no short description; nothing to extract")]
    NoContent,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors surfaced by the scraping pipeline.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error("{url} did not render `{selector}` within {timeout:?}")]
    NavigationTimeout {
        url: String,
        selector: String,
        timeout: Duration,
    },

    #[error("extraction failed for {url}: {source}")]
    Extraction {
        url: String,
        #[source]
        source: ExtractionError,
    },

    #[error("notification list `{selector}` never became visible within {timeout:?}")]
    ObstructionTimeout { selector: String, timeout: Duration },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScrapeError {
    pub fn navigation(url: &str, source: BrowserError) -> Self {
        ScrapeError::Navigation {
            url: url.to_string(),
            source,
        }
    }

    pub fn extraction(url: &str, source: ExtractionError) -> Self {
        ScrapeError::Extraction {
            url: url.to_string(),
            source,
        }
    }

    /// Per-article errors are retried; everything else ends the run.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Navigation { .. }
                | ScrapeError::NavigationTimeout { .. }
                | ScrapeError::Extraction { .. }
        )
    }
}
