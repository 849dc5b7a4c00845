//! Tracing subscriber setup.
//!
//! Two layers share one registry:
//! - console: compact lines, level from `RUST_LOG` (default `info`)
//! - log file: everything from `debug` up, with timestamps and targets, so
//!   retries and skips can be diagnosed after the run
//!
//! The returned guard flushes the file writer when dropped; keep it alive
//! until the program exits.

use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, EnvFilter, Layer};

const FILE_FILTER: &str = "debug,chromiumoxide=warn,tungstenite=warn,html5ever=warn,selectors=warn";

pub fn init(log_path: &Path) -> Result<WorkerGuard, Box<dyn Error>> {
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tfmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let file_layer = tfmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tfmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()?;
    Ok(guard)
}
