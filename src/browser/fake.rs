//! Scripted browser for tests.
//!
//! The feed is a list of HTML snapshots; a successful "load more" click moves
//! to the next one. Articles are served from a URL → HTML map, and every tab
//! open is counted so tests can assert on retries and tab lifetime.

use super::{ArticleTab, Browser};
use crate::error::BrowserError;
use scraper::{Html, Selector};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

fn matches(html: &str, selector: &str) -> bool {
    match Selector::parse(selector) {
        Ok(sel) => Html::parse_document(html).select(&sel).next().is_some(),
        Err(_) => false,
    }
}

#[derive(Default)]
pub struct FakeBrowser {
    pub feed: Vec<String>,
    pub load_more_label: String,
    pub articles: HashMap<String, String>,
    /// Articles whose navigation never completes.
    pub stalled: Vec<String>,
    /// Timeout passed to each `open_tab` call.
    pub open_timeouts: RefCell<Vec<Duration>>,
    /// When false the feed never becomes visible.
    pub feed_visible: bool,
    pub page_index: Cell<usize>,
    pub visited: RefCell<Vec<String>>,
    pub removed: RefCell<Vec<String>>,
    pub opens: RefCell<HashMap<String, usize>>,
    pub open_tabs: Rc<Cell<usize>>,
    pub max_open_tabs: Rc<Cell<usize>>,
}

impl FakeBrowser {
    pub fn new(feed: Vec<String>) -> Self {
        FakeBrowser {
            feed,
            load_more_label: "المزيد".to_string(),
            feed_visible: true,
            ..Default::default()
        }
    }

    pub fn with_article(mut self, url: &str, html: String) -> Self {
        self.articles.insert(url.to_string(), html);
        self
    }

    pub fn with_stalled_article(mut self, url: &str) -> Self {
        self.stalled.push(url.to_string());
        self
    }

    pub fn opens_of(&self, url: &str) -> usize {
        self.opens.borrow().get(url).copied().unwrap_or(0)
    }

    fn current(&self) -> String {
        self.feed
            .get(self.page_index.get())
            .cloned()
            .unwrap_or_default()
    }
}

impl Browser for FakeBrowser {
    type Tab = FakeTab;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.visited.borrow_mut().push(url.to_string());
        self.page_index.set(0);
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.current())
    }

    async fn remove_elements(&self, selector: &str) -> Result<usize, BrowserError> {
        self.removed.borrow_mut().push(selector.to_string());
        Ok(0)
    }

    async fn click(&self, _selector: &str) -> Result<bool, BrowserError> {
        Ok(false)
    }

    async fn click_text(
        &self,
        _scope: &str,
        _exclude: &str,
        labels: &[String],
    ) -> Result<bool, BrowserError> {
        let next = self.page_index.get() + 1;
        if labels.contains(&self.load_more_label) && next < self.feed.len() {
            self.page_index.set(next);
            return Ok(true);
        }
        Ok(false)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.feed_visible && matches(&self.current(), selector))
    }

    async fn open_tab(&self, url: &str, timeout: Duration) -> Result<FakeTab, BrowserError> {
        *self.opens.borrow_mut().entry(url.to_string()).or_insert(0) += 1;
        self.open_timeouts.borrow_mut().push(timeout);
        if self.stalled.iter().any(|u| u == url) {
            tokio::time::sleep(timeout).await;
            return Err(BrowserError::Unavailable(format!(
                "{url} did not load within {timeout:?}"
            )));
        }
        let html = self
            .articles
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Unavailable(url.to_string()))?;
        self.open_tabs.set(self.open_tabs.get() + 1);
        self.max_open_tabs
            .set(self.max_open_tabs.get().max(self.open_tabs.get()));
        Ok(FakeTab {
            html,
            open_tabs: Rc::clone(&self.open_tabs),
        })
    }
}

pub struct FakeTab {
    html: String,
    open_tabs: Rc<Cell<usize>>,
}

impl ArticleTab for FakeTab {
    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.html.clone())
    }

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(matches(&self.html, selector))
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.open_tabs.set(self.open_tabs.get() - 1);
        Ok(())
    }
}

/// HTML fixtures shaped like the Al Jadeed templates.
pub mod fixtures {
    pub struct Tile<'a> {
        pub time: &'a str,
        pub title: &'a str,
        pub href: &'a str,
    }

    pub fn feed(tiles: &[Tile<'_>], load_more: bool) -> String {
        let mut html = String::from("<html><body><div class=\"notifications\">");
        for t in tiles {
            html.push_str(&format!(
                "<div class=\"card__item\"><span class=\"card-date\">{}</span>\
                 <h3 class=\"card-title\"><a href=\"{}\">{}</a></h3></div>",
                t.time, t.href, t.title
            ));
        }
        html.push_str("</div>");
        if load_more {
            html.push_str("<button class=\"more\">المزيد</button>");
        }
        html.push_str("</body></html>");
        html
    }

    pub fn article(
        title: &str,
        date: Option<&str>,
        category: &str,
        short: Option<&str>,
        long: Option<&str>,
    ) -> String {
        let mut html = format!("<html><body><h1>{title}</h1>");
        html.push_str(&format!(
            "<nav><a href=\"/\">الرئيسية</a><a href=\"/c\">{category}</a></nav>"
        ));
        if let Some(d) = date {
            html.push_str(&format!("<div class=\"date\">{d}</div>"));
        }
        if let Some(s) = short {
            html.push_str(&format!(
                "<span id=\"ctl00_MainContent_ArticleDetailsDescription21_lblShortDesc\">{s}</span>"
            ));
        }
        if let Some(l) = long {
            html.push_str(&format!("<div class=\"LongDesc\">{l}</div>"));
        }
        html.push_str("</body></html>");
        html
    }
}
