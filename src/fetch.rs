//! Article fetching with bounded retry.
//!
//! # Architecture
//!
//! - [`FetchArticle`]: core trait, one attempt at turning a URL into a record
//! - [`TabFetcher`]: opens the article in its own tab, extracts, closes the tab
//! - [`RetryFetch`]: decorator that retries any [`FetchArticle`] a fixed number of times
//!
//! # Retry Strategy
//!
//! - At most 3 attempts per article
//! - Fixed delay between attempts (2 seconds by default)
//! - Only per-article errors (navigation, extraction) are retried

use crate::browser::{wait_until, ArticleTab, Browser};
use crate::config::{CrawlConfig, SiteProfile};
use crate::error::ScrapeError;
use crate::models::ArticleRecord;
use crate::scrapers::article::extract_article;
use chrono::Local;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// One attempt at fetching and extracting an article.
pub trait FetchArticle {
    async fn fetch(&self, url: &str) -> Result<ArticleRecord, ScrapeError>;
}

/// Fetches an article in a dedicated tab of `browser`.
///
/// The tab is closed on every exit path, so at most one article tab exists
/// alongside the feed at any time.
pub struct TabFetcher<'a, B> {
    pub browser: &'a B,
    pub profile: &'a SiteProfile,
    pub config: &'a CrawlConfig,
}

impl<B> fmt::Debug for TabFetcher<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabFetcher")
            .field("wait_timeout", &self.config.wait_timeout)
            .finish()
    }
}

impl<B: Browser> TabFetcher<'_, B> {
    async fn extract_from<T: ArticleTab>(
        &self,
        tab: &T,
        url: &str,
    ) -> Result<ArticleRecord, ScrapeError> {
        let selector = &self.profile.article_title;
        let ready = wait_until(self.config.wait_timeout, self.config.poll_interval, move || {
            tab.has_element(selector)
        })
        .await
        .map_err(|e| ScrapeError::navigation(url, e))?;
        if !ready {
            return Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                selector: selector.clone(),
                timeout: self.config.wait_timeout,
            });
        }

        let html = tab
            .content()
            .await
            .map_err(|e| ScrapeError::navigation(url, e))?;
        let record = extract_article(&html, url, self.profile, Local::now().naive_local())
            .map_err(|e| ScrapeError::extraction(url, e))?;
        info!(
            title = %record.title,
            category = if record.category.is_empty() { "N/A" } else { record.category.as_str() },
            "Scraped article"
        );
        Ok(record)
    }
}

impl<B: Browser> FetchArticle for TabFetcher<'_, B> {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<ArticleRecord, ScrapeError> {
        let tab = self
            .browser
            .open_tab(url, self.config.wait_timeout)
            .await
            .map_err(|e| ScrapeError::navigation(url, e))?;

        let result = self.extract_from(&tab, url).await;

        if let Err(e) = tab.close().await {
            warn!(%url, error = %e, "Failed to close article tab");
        }
        result
    }
}

/// Retries the wrapped fetcher up to `max_attempts` times with a fixed delay.
pub struct RetryFetch<T> {
    inner: T,
    max_attempts: usize,
    delay: Duration,
}

impl<T: FetchArticle> RetryFetch<T> {
    pub fn new(inner: T, max_attempts: usize, delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T: FetchArticle> FetchArticle for RetryFetch<T> {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<ArticleRecord, ScrapeError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            debug!(attempt, max = self.max_attempts, "Article attempt");
            match self.inner.fetch(url).await {
                Ok(record) => return Ok(record),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(
                        %url,
                        attempt,
                        max = self.max_attempts,
                        error = %e,
                        error_detail = ?e,
                        "Article attempt failed"
                    );
                    if attempt >= self.max_attempts {
                        error!(
                            %url,
                            attempts = attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "Giving up on article"
                        );
                        return Err(e);
                    }
                    sleep(self.delay).await;
                }
            }
        }
    }
}

/// Fetch one article in a new tab, retrying per `config`.
pub async fn fetch_with_retry<B: Browser>(
    browser: &B,
    profile: &SiteProfile,
    config: &CrawlConfig,
    url: &str,
) -> Result<ArticleRecord, ScrapeError> {
    let fetcher = TabFetcher {
        browser,
        profile,
        config,
    };
    RetryFetch::new(fetcher, config.max_attempts, config.retry_delay)
        .fetch(url)
        .await
}
