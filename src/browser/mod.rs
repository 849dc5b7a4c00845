//! Rendering-engine capabilities the crawler relies on.
//!
//! The crawler never talks to Chromium directly. It sees a [`Browser`] holding
//! the notifications page and short-lived [`ArticleTab`]s opened per article.
//! Markup is read back as HTML and parsed with `scraper`, so extraction logic
//! stays independent of the engine.
//!
//! - [`chrome`]: `chromiumoxide` implementation used by the binary
//! - `fake`: scripted in-memory implementation used by the tests

pub mod chrome;
#[cfg(test)]
pub mod fake;

use crate::error::BrowserError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// The main window, showing the notification feed.
pub trait Browser {
    type Tab: ArticleTab;

    /// Navigate the main page and wait for the load event.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Serialized DOM of the main page.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Detach every element matching `selector`; returns how many were removed.
    async fn remove_elements(&self, selector: &str) -> Result<usize, BrowserError>;

    /// Click the first element matching `selector`; `false` when nothing matched.
    async fn click(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Click the first enabled, visible element matching `scope` whose own
    /// text contains one of `labels`. Elements inside `exclude` (ignored when
    /// empty) never match. `false` when nothing matched.
    async fn click_text(
        &self,
        scope: &str,
        exclude: &str,
        labels: &[String],
    ) -> Result<bool, BrowserError>;

    /// Whether at least one element matching `selector` is rendered and visible.
    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Open `url` in a new tab, giving up after `timeout`.
    ///
    /// On error no tab is left behind. On success the caller owns the tab and
    /// must [`ArticleTab::close`] it.
    async fn open_tab(&self, url: &str, timeout: Duration) -> Result<Self::Tab, BrowserError>;
}

/// A tab holding one article page.
pub trait ArticleTab {
    async fn content(&self) -> Result<String, BrowserError>;

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError>;

    async fn close(self) -> Result<(), BrowserError>;
}

/// Poll `probe` until it yields `true` or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. Probe errors are propagated immediately.
pub async fn wait_until<F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<bool, BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, BrowserError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(poll_interval).await;
    }
}
