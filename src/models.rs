//! Data models for notifications and collected articles.
//!
//! - [`NotificationEntry`]: one tile in the feed, consumed within a single crawl step
//! - [`ArticleRecord`]: a fully extracted article, the unit of persistence
//! - [`CsvRow`]: the on-disk form of a record, one string per column

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column order of the persisted store.
pub const CSV_FIELDS: [&str; 7] = [
    "ScrapedAt",
    "PublishedAt",
    "URL",
    "Title",
    "Body",
    "Category",
    "IsNotificationOnly",
];

pub const SCRAPED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A notification tile as rendered in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEntry {
    /// Coarse `HH:MM` label; carries no date so it is never compared to the watermark.
    pub time: String,
    pub title: String,
    /// Absolute article link.
    pub url: String,
}

/// An extracted article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub scraped_at: NaiveDateTime,
    pub published_at: NaiveDateTime,
    pub url: String,
    pub title: String,
    /// Short description, then a blank line and the long description when present.
    pub body: String,
    /// Empty when the page's label matched no known category.
    pub category: String,
    /// True iff the page had no long description.
    pub is_notification_only: bool,
}

/// One line of the CSV store.
///
/// Rows loaded from disk stay as strings so that files written by older
/// tooling (e.g. with an empty `PublishedAt`) survive a rewrite untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CsvRow {
    #[serde(rename = "ScrapedAt")]
    pub scraped_at: String,
    #[serde(rename = "PublishedAt")]
    pub published_at: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "IsNotificationOnly")]
    pub is_notification_only: String,
}

impl From<&ArticleRecord> for CsvRow {
    fn from(a: &ArticleRecord) -> Self {
        CsvRow {
            scraped_at: a.scraped_at.format(SCRAPED_AT_FORMAT).to_string(),
            published_at: a.published_at.format(PUBLISHED_AT_FORMAT).to_string(),
            url: a.url.clone(),
            title: a.title.clone(),
            body: a.body.clone(),
            category: a.category.clone(),
            is_notification_only: if a.is_notification_only { "True" } else { "False" }.to_string(),
        }
    }
}
