//! Command-line interface definitions for the Al Jadeed notifications scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The browser location can also come from the environment.

use crate::utils::parse_until;
use chrono::NaiveDateTime;
use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Everything published since midnight on the 17th
/// aljadeed_notifications --url https://www.aljadeed.tv/pushed-notifications --until "2025-11-17 00:00"
///
/// # Watch the browser work, write somewhere else
/// aljadeed_notifications --url https://www.aljadeed.tv/pushed-notifications \
///     --until 2025-11-17 --csv ./out/news.csv --no-headless
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Pushed-notifications page to start from
    #[arg(short, long)]
    pub url: Url,

    /// Stop at the first article published before this time (site-local, e.g. "2025-11-17 00:00")
    #[arg(long, value_parser = parse_until)]
    pub until: NaiveDateTime,

    /// CSV file the articles are merged into
    #[arg(long, default_value = "aljadeed_news.csv")]
    pub csv: PathBuf,

    /// Run log, appended to on every run
    #[arg(long, default_value = "aljadeed_scraper.log")]
    pub log: PathBuf,

    /// Show the browser window
    #[arg(long)]
    pub no_headless: bool,

    /// Optional YAML site profile overriding selectors, labels and categories
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Chrome/Chromium executable; auto-detected when omitted
    #[arg(long, env = "CHROME_PATH")]
    pub chrome: Option<PathBuf>,
}
