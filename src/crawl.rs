//! The crawl loop: walk the feed newest-first until the watermark is crossed.
//!
//! ```text
//! Initializing ──▶ ReadingPage ──▶ (entries) ──┬─▶ Stopped    article older than `until`
//!                     ▲                         ├─▶ Paginating "load more" present
//!                     └──────── Paginating ◀────┘   └─▶ Finished when nothing new loads
//!                                               └─▶ Finished   no "load more"
//! ```
//!
//! Each entry is resolved to a [`Step`]. Already-stored URLs are skipped
//! without a fetch and never consulted for the watermark, so the newest
//! articles from a previous run do not end the crawl early.

use crate::browser::Browser;
use crate::config::{CrawlConfig, SiteProfile};
use crate::dedup::SeenUrls;
use crate::error::ScrapeError;
use crate::fetch::fetch_with_retry;
use crate::models::NotificationEntry;
use crate::outputs::csv::{CsvStore, Prepend};
use crate::scrapers::notifications::{collect_notifications, load_more};
use crate::scrapers::obstructions::clear_obstructions;
use crate::utils::truncate_for_log;
use chrono::NaiveDateTime;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Control-flow result of handling one entry or one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
    PageExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Initializing,
    ReadingPage,
    Paginating,
    Stopped,
    Finished,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// An article older than the watermark was reached.
    Stopped,
    /// The feed ran out first.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub pages: usize,
    pub written: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// `Stop` once an article was published strictly before `until`.
pub fn apply_watermark(published_at: NaiveDateTime, until: NaiveDateTime) -> Step {
    if published_at < until {
        Step::Stop
    } else {
        Step::Continue
    }
}

pub struct Crawler<'a, B> {
    browser: &'a B,
    profile: &'a SiteProfile,
    config: &'a CrawlConfig,
    store: &'a mut CsvStore,
    seen: SeenUrls,
    pages: usize,
    written: usize,
    duplicates: usize,
    failed: usize,
}

impl<'a, B: Browser> Crawler<'a, B> {
    pub fn new(
        browser: &'a B,
        profile: &'a SiteProfile,
        config: &'a CrawlConfig,
        store: &'a mut CsvStore,
    ) -> Self {
        let seen = store.seen_urls();
        Crawler {
            browser,
            profile,
            config,
            store,
            seen,
            pages: 0,
            written: 0,
            duplicates: 0,
            failed: 0,
        }
    }

    /// Run until `Stopped` or `Finished`.
    ///
    /// Errors only for failures while opening the feed, and for store write
    /// failures. Rows already written are kept either way.
    #[instrument(
        level = "info",
        skip_all,
        fields(start_url = %self.config.start_url, until = %self.config.until)
    )]
    pub async fn run(&mut self) -> Result<CrawlReport, ScrapeError> {
        let page_url = self.config.start_url.clone();
        let mut state = CrawlState::Initializing;
        let mut tiles_seen = 0usize;

        loop {
            debug!(?state, "Crawl state");
            state = match state {
                CrawlState::Initializing => {
                    self.initialize(&page_url).await?;
                    CrawlState::ReadingPage
                }
                CrawlState::ReadingPage => {
                    self.pages += 1;
                    let read =
                        collect_notifications(self.browser, &page_url, self.profile, tiles_seen)
                            .await;
                    let page = match read {
                        Ok(page) => page,
                        Err(e) => {
                            error!(
                                error = %e,
                                error_detail = ?e,
                                "Could not read notifications; ending crawl"
                            );
                            break;
                        }
                    };
                    tiles_seen = page.tile_count;

                    match self.process_batch(&page.entries, tiles_seen).await? {
                        Step::Stop => CrawlState::Stopped,
                        _ if page.has_more => CrawlState::Paginating,
                        _ => {
                            info!("No 'load more' control; reached end of notifications");
                            CrawlState::Finished
                        }
                    }
                }
                CrawlState::Paginating => {
                    info!("Loading older notifications");
                    let loaded =
                        load_more(self.browser, &page_url, self.profile, self.config, tiles_seen)
                            .await;
                    match loaded {
                        Ok(true) => CrawlState::ReadingPage,
                        Ok(false) => CrawlState::Finished,
                        Err(e) => {
                            error!(
                                error = %e,
                                error_detail = ?e,
                                "Pagination failed; ending crawl"
                            );
                            CrawlState::Finished
                        }
                    }
                }
                CrawlState::Stopped | CrawlState::Finished => break,
            };
        }

        let report = CrawlReport {
            outcome: if state == CrawlState::Stopped {
                CrawlOutcome::Stopped
            } else {
                CrawlOutcome::Finished
            },
            pages: self.pages,
            written: self.written,
            duplicates: self.duplicates,
            failed: self.failed,
        };
        info!(
            outcome = ?report.outcome,
            pages = report.pages,
            written = report.written,
            duplicates = report.duplicates,
            failed = report.failed,
            total_rows = self.store.len(),
            "Crawl done"
        );
        Ok(report)
    }

    async fn initialize(&self, page_url: &Url) -> Result<(), ScrapeError> {
        info!(url = %page_url, "Opening notifications page");
        self.browser
            .goto(page_url.as_str())
            .await
            .map_err(|e| ScrapeError::navigation(page_url.as_str(), e))?;
        clear_obstructions(self.browser, self.profile, self.config).await
    }

    async fn process_batch(
        &mut self,
        entries: &[NotificationEntry],
        visible: usize,
    ) -> Result<Step, ScrapeError> {
        let first_index = visible - entries.len().min(visible);
        for (i, entry) in entries.iter().enumerate() {
            info!(
                "[{}/{}] Time={} | Title='{}'",
                first_index + i + 1,
                visible,
                entry.time,
                truncate_for_log(&entry.title, 80)
            );
            if self.process_entry(entry).await? == Step::Stop {
                return Ok(Step::Stop);
            }
        }
        Ok(Step::PageExhausted)
    }

    async fn process_entry(&mut self, entry: &NotificationEntry) -> Result<Step, ScrapeError> {
        if self.seen.contains(&entry.url) {
            debug!(url = %entry.url, "URL already scraped, skipping");
            self.duplicates += 1;
            return Ok(Step::Continue);
        }

        let fetched = fetch_with_retry(self.browser, self.profile, self.config, &entry.url).await;
        let record = match fetched {
            Ok(record) => record,
            Err(e) => {
                warn!(url = %entry.url, error = %e, "Failed to scrape article, moving on");
                self.failed += 1;
                return Ok(Step::Continue);
            }
        };

        if apply_watermark(record.published_at, self.config.until) == Step::Stop {
            info!(
                title = %record.title,
                url = %record.url,
                published_at = %record.published_at,
                until = %self.config.until,
                "Article is older than 'until'. Stopping."
            );
            return Ok(Step::Stop);
        }

        match self.store.prepend(&record, &mut self.seen)? {
            Prepend::Written => self.written += 1,
            Prepend::Duplicate => self.duplicates += 1,
        }
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::fixtures::{self, Tile};
    use crate::browser::fake::FakeBrowser;
    use crate::error::StoreError;
    use crate::utils::parse_until;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    const START: &str = "https://www.aljadeed.tv/pushed-notifications";

    fn config(until: &str) -> CrawlConfig {
        let mut cfg = CrawlConfig::new(Url::parse(START).unwrap(), parse_until(until).unwrap());
        cfg.retry_delay = Duration::ZERO;
        cfg.wait_timeout = Duration::from_millis(20);
        cfg.cookie_wait = Duration::from_millis(2);
        cfg.poll_interval = Duration::from_millis(1);
        cfg
    }

    fn url(n: u32) -> String {
        format!("https://www.aljadeed.tv/news/{n}")
    }

    fn tiles(ns: &[u32]) -> Vec<(String, String)> {
        ns.iter().map(|n| (format!("/news/{n}"), format!("خبر {n}"))).collect()
    }

    fn feed(ns: &[u32], load_more: bool) -> String {
        let t = tiles(ns);
        let tiles: Vec<Tile> = t
            .iter()
            .map(|(href, title)| Tile { time: "10:00", title, href })
            .collect();
        fixtures::feed(&tiles, load_more)
    }

    fn article(date: &str) -> String {
        fixtures::article("عنوان", Some(date), "محليات", Some("ملخص"), Some("<p>نص كامل</p>"))
    }

    fn three_article_feed() -> FakeBrowser {
        FakeBrowser::new(vec![feed(&[1, 2, 3, 4], false)])
            .with_article(&url(1), article("2025-11-18 | 10:00"))
            .with_article(&url(2), article("2025-11-17 | 12:00"))
            .with_article(&url(3), article("2025-11-10 | 09:00"))
            .with_article(&url(4), article("2025-11-09 | 09:00"))
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_watermark_is_inclusive() {
        let until = parse_until("2025-11-17 00:00").unwrap();
        assert_eq!(apply_watermark(until, until), Step::Continue);
        let before = parse_until("2025-11-16 23:59").unwrap();
        let after = parse_until("2025-11-18 10:00").unwrap();
        assert_eq!(apply_watermark(before, until), Step::Stop);
        assert_eq!(apply_watermark(after, until), Step::Continue);
    }

    #[tokio::test]
    async fn test_stops_at_first_article_older_than_watermark() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("news.csv");
        let browser = three_article_feed();
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&path).unwrap();

        let report = Crawler::new(&browser, &profile, &cfg, &mut store).run().await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::Stopped);
        assert_eq!(report.written, 2);
        assert_eq!(browser.opens_of(&url(3)), 1);
        assert_eq!(browser.opens_of(&url(4)), 0);

        let stored = CsvStore::open(&path).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.rows()[0].url, url(2));
        assert_eq!(stored.rows()[1].url, url(1));
        assert_eq!(stored.rows()[0].published_at, "2025-11-17T12:00");
        assert_eq!(stored.rows()[0].body, "ملخص\n\nنص كامل");
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing_new() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("news.csv");
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");

        let first = three_article_feed();
        let mut store = CsvStore::open(&path).unwrap();
        Crawler::new(&first, &profile, &cfg, &mut store).run().await.unwrap();

        let second = three_article_feed();
        let mut store = CsvStore::open(&path).unwrap();
        let report = Crawler::new(&second, &profile, &cfg, &mut store).run().await.unwrap();

        assert_eq!(report.written, 0);
        assert_eq!(report.duplicates, 2);
        assert_eq!(second.opens_of(&url(1)), 0);
        assert_eq!(second.opens_of(&url(2)), 0);
        assert_eq!(CsvStore::open(&path).unwrap().len(), 2);

        let urls: std::collections::HashSet<_> =
            store.rows().iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls.len(), store.len());
    }

    #[tokio::test]
    async fn test_known_old_article_does_not_stop_crawl() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("news.csv");
        std::fs::write(
            &path,
            format!(
                "ScrapedAt,PublishedAt,URL,Title,Body,Category,IsNotificationOnly\n\
                 2025-11-01T10:00:00,2025-11-01T09:00,{},old,b,,False\n",
                url(1)
            ),
        )
        .unwrap();
        let browser = FakeBrowser::new(vec![feed(&[1, 2], false)])
            .with_article(&url(1), article("2025-11-01 | 09:00"))
            .with_article(&url(2), article("2025-11-18 | 09:00"));
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&path).unwrap();

        let report = Crawler::new(&browser, &profile, &cfg, &mut store).run().await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::Finished);
        assert_eq!(report.written, 1);
        assert_eq!(browser.opens_of(&url(1)), 0);
        assert_eq!(store.rows()[0].url, url(2));
    }

    #[tokio::test]
    async fn test_notification_only_article_row() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("news.csv");
        let browser = FakeBrowser::new(vec![feed(&[1], false)]).with_article(
            &url(1),
            fixtures::article(
                "عاجل",
                Some("2025-11-18 | 09:00"),
                "رياضة",
                Some("نص الإشعار"),
                None,
            ),
        );
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&path).unwrap();

        Crawler::new(&browser, &profile, &cfg, &mut store).run().await.unwrap();

        let stored = CsvStore::open(&path).unwrap();
        let row = &stored.rows()[0];
        assert_eq!(row.is_notification_only, "True");
        assert_eq!(row.body, "نص الإشعار");
        assert_eq!(row.category, "رياضة");
    }

    #[tokio::test]
    async fn test_article_without_date_is_retried_then_skipped() {
        let buf = Captured::default();
        let sink = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || sink.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let tmp = TempDir::new().unwrap();
        let browser = FakeBrowser::new(vec![feed(&[1, 2], false)])
            .with_article(&url(1), fixtures::article("t", None, "", Some("s"), None))
            .with_article(&url(2), article("2025-11-18 | 09:00"));
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&tmp.path().join("news.csv")).unwrap();

        let report = Crawler::new(&browser, &profile, &cfg, &mut store).run().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.written, 1);
        assert_eq!(browser.opens_of(&url(1)), 3);
        assert_eq!(browser.max_open_tabs.get(), 1);
        assert_eq!(browser.open_tabs.get(), 0);
        assert_eq!(store.rows()[0].url, url(2));

        let logs = buf.text();
        let retries = logs
            .lines()
            .filter(|l| l.contains("Article attempt failed") && l.contains(&url(1)))
            .count();
        assert_eq!(retries, 3);
        assert!(logs.contains("Giving up on article"));
    }

    #[tokio::test]
    async fn test_no_load_more_finishes_after_one_page() {
        let tmp = TempDir::new().unwrap();
        let browser = FakeBrowser::new(vec![feed(&[1], false), feed(&[1, 2], false)])
            .with_article(&url(1), article("2025-11-18 | 09:00"))
            .with_article(&url(2), article("2025-11-18 | 08:00"));
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&tmp.path().join("news.csv")).unwrap();

        let report = Crawler::new(&browser, &profile, &cfg, &mut store).run().await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::Finished);
        assert_eq!(report.pages, 1);
        assert_eq!(report.written, 1);
        assert_eq!(browser.opens_of(&url(2)), 0);
    }

    #[tokio::test]
    async fn test_load_more_reads_only_new_tiles() {
        let tmp = TempDir::new().unwrap();
        let browser = FakeBrowser::new(vec![feed(&[1, 2], true), feed(&[1, 2, 3], false)])
            .with_article(&url(1), article("2025-11-18 | 09:00"))
            .with_article(&url(2), article("2025-11-18 | 08:00"))
            .with_article(&url(3), article("2025-11-17 | 08:00"));
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&tmp.path().join("news.csv")).unwrap();

        let report = Crawler::new(&browser, &profile, &cfg, &mut store).run().await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::Finished);
        assert_eq!(report.pages, 2);
        assert_eq!(report.written, 3);
        assert_eq!(report.duplicates, 0);
        assert_eq!(browser.opens_of(&url(1)), 1);
        assert_eq!(store.rows()[0].url, url(3));
    }

    #[tokio::test]
    async fn test_store_write_failure_aborts_crawl() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("news.csv");
        std::fs::create_dir(tmp.path().join("news.csv.tmp")).unwrap();
        let browser = FakeBrowser::new(vec![feed(&[1, 2], false)])
            .with_article(&url(1), article("2025-11-18 | 09:00"))
            .with_article(&url(2), article("2025-11-18 | 08:00"));
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&path).unwrap();

        let err = Crawler::new(&browser, &profile, &cfg, &mut store)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Store(StoreError::Io(_))));
        assert!(!err.is_retryable());
        assert_eq!(browser.opens_of(&url(2)), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_hidden_feed_fails_initialization() {
        let tmp = TempDir::new().unwrap();
        let mut browser = FakeBrowser::new(vec![feed(&[1], false)]);
        browser.feed_visible = false;
        let profile = SiteProfile::default();
        let cfg = config("2025-11-17 00:00");
        let mut store = CsvStore::open(&tmp.path().join("news.csv")).unwrap();

        let err = Crawler::new(&browser, &profile, &cfg, &mut store).run().await.unwrap_err();

        assert!(matches!(err, ScrapeError::ObstructionTimeout { .. }));
        assert_eq!(browser.visited.borrow().as_slice(), [START.to_string()]);
        assert!(store.is_empty());
    }
}
