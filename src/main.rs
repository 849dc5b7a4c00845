//! # Al Jadeed Notifications
//!
//! Scrapes Al Jadeed's pushed-notifications feed with a real browser and
//! merges every article newer than a watermark into a CSV file.
//!
//! ## Features
//!
//! - Walks the feed newest-first, paging with the "load more" control
//! - Stops at the first article published before `--until`
//! - Opens each article in its own tab and extracts title, date, category and body
//! - Retries flaky articles up to 3 times before skipping them
//! - Skips URLs already present in the CSV, so re-runs are idempotent
//!
//! ## Usage
//!
//! ```sh
//! aljadeed_notifications --url https://www.aljadeed.tv/pushed-notifications --until "2025-11-17 00:00"
//! ```
//!
//! ## Architecture
//!
//! 1. **Setup**: parse arguments, check output paths, start logging, load the CSV store
//! 2. **Feed**: open the notifications page and clear overlays and banners
//! 3. **Crawl**: read tiles, fetch articles, prepend rows until the watermark or the end of the feed
//! 4. **Teardown**: shut the browser down (also on Ctrl+C) and report totals

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};

mod browser;
mod cli;
mod config;
mod crawl;
mod dedup;
mod error;
mod fetch;
mod logging;
mod models;
mod outputs;
mod scrapers;
mod utils;

use browser::chrome::{ChromeBrowser, ChromeOptions};
use cli::Cli;
use config::{CrawlConfig, SiteProfile};
use crawl::Crawler;
use outputs::csv::CsvStore;
use utils::{ensure_writable_parent, until_interrupted};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // Both files must be writable before anything is opened.
    for path in [&args.csv, &args.log] {
        if let Err(e) = ensure_writable_parent(path).await {
            eprintln!("{} is not writable: {e}", path.display());
            return Err(e);
        }
    }

    let _log_guard = logging::init(&args.log)?;
    let start_time = std::time::Instant::now();
    info!(
        url = %args.url,
        until = %args.until,
        csv = %args.csv.display(),
        "aljadeed_notifications starting up"
    );
    debug!(?args, "Parsed CLI arguments");

    let profile = match &args.profile {
        Some(path) => SiteProfile::from_yaml_file(path)?,
        None => SiteProfile::default(),
    };
    let config = CrawlConfig::new(args.url.clone(), args.until);

    let mut store = CsvStore::open(&args.csv)?;
    info!(rows = store.len(), path = %store.path().display(), "Loaded CSV store");

    let browser = ChromeBrowser::launch(&ChromeOptions {
        headless: !args.no_headless,
        executable: args.chrome.clone(),
    })
    .await?;

    let crawl = async { Crawler::new(&browser, &profile, &config, &mut store).run().await };
    let result = until_interrupted(crawl, tokio::signal::ctrl_c()).await;
    if result.is_none() {
        warn!("Interrupted by user (Ctrl+C)");
    }
    browser.shutdown().await;

    let report = match result {
        None => {
            info!(rows = store.len(), "Scraper finished");
            return Ok(());
        }
        Some(Ok(report)) => report,
        Some(Err(e)) => {
            error!(error = %e, error_detail = ?e, "Crawl aborted");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        outcome = ?report.outcome,
        written = report.written,
        rows = store.len(),
        "Execution complete"
    );

    Ok(())
}
