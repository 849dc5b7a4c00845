//! Chromium backend over the DevTools protocol (`chromiumoxide`).
//!
//! DOM interactions are small JavaScript snippets evaluated in the page.
//! Selectors and labels are embedded as JSON string literals so that quotes
//! in them cannot break the script.

use super::{ArticleTab, Browser};
use crate::error::BrowserError;
use chromiumoxide::{BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Launch options.
#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
}

/// A running Chromium with its notifications page.
pub struct ChromeBrowser {
    browser: chromiumoxide::Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeBrowser {
    #[instrument(level = "info", skip_all, fields(headless = options.headless))]
    pub async fn launch(options: &ChromeOptions) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--lang=ar,en-US");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = chromiumoxide::Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "chromiumoxide handler event error");
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!("Browser launched");
        Ok(ChromeBrowser {
            browser,
            page,
            handler_task,
        })
    }

    /// Close the browser process and stop the event handler.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        info!("Browser shut down");
    }
}

async fn eval<T: DeserializeOwned>(page: &Page, script: String) -> Result<T, BrowserError> {
    let result = page.evaluate(script).await?;
    Ok(result.into_value::<T>()?)
}

fn js_str(s: &str) -> Result<String, BrowserError> {
    Ok(serde_json::to_string(s)?)
}

impl Browser for ChromeBrowser {
    type Tab = ChromeTab;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn remove_elements(&self, selector: &str) -> Result<usize, BrowserError> {
        let script = format!(
            r#"(() => {{
                const els = document.querySelectorAll({sel});
                els.forEach(e => e.remove());
                return els.length;
            }})()"#,
            sel = js_str(selector)?
        );
        eval(&self.page, script).await
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            sel = js_str(selector)?
        );
        eval(&self.page, script).await
    }

    async fn click_text(
        &self,
        scope: &str,
        exclude: &str,
        labels: &[String],
    ) -> Result<bool, BrowserError> {
        let script = format!(
            r#"(() => {{
                const labels = {labels};
                const exclude = {exclude};
                const ownText = (el) => Array.from(el.childNodes)
                    .filter(n => n.nodeType === Node.TEXT_NODE)
                    .map(n => n.textContent)
                    .join('');
                for (const el of document.querySelectorAll({scope})) {{
                    if (el.disabled || el.getAttribute('aria-disabled') === 'true') continue;
                    if (exclude && el.closest(exclude)) continue;
                    const style = window.getComputedStyle(el);
                    if (style.display === 'none' || style.visibility === 'hidden') continue;
                    const rect = el.getBoundingClientRect();
                    if (rect.width === 0 || rect.height === 0) continue;
                    const text = ownText(el);
                    if (!labels.some(l => text.includes(l))) continue;
                    el.scrollIntoView(true);
                    el.click();
                    return true;
                }}
                return false;
            }})()"#,
            labels = serde_json::to_string(labels)?,
            exclude = js_str(exclude.trim())?,
            scope = js_str(scope)?
        );
        eval(&self.page, script).await
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        let script = format!(
            r#"(() => {{
                for (const el of document.querySelectorAll({sel})) {{
                    const style = window.getComputedStyle(el);
                    if (style.display === 'none' || style.visibility === 'hidden') continue;
                    const rect = el.getBoundingClientRect();
                    if (rect.width > 0 && rect.height > 0) return true;
                }}
                return false;
            }})()"#,
            sel = js_str(selector)?
        );
        eval(&self.page, script).await
    }

    /// Creates a blank target first so the tab can still be closed when the
    /// navigation fails or stalls.
    async fn open_tab(&self, url: &str, timeout: Duration) -> Result<ChromeTab, BrowserError> {
        let page = self.browser.new_page("about:blank").await?;
        let navigation =
            tokio::time::timeout(timeout, async { page.goto(url).await.map(|_| ()) });
        let failure = match navigation.await {
            Ok(Ok(_)) => return Ok(ChromeTab { page }),
            Ok(Err(e)) => BrowserError::from(e),
            Err(_) => BrowserError::Unavailable(format!("{url} did not load within {timeout:?}")),
        };
        if let Err(e) = page.close().await {
            warn!(%url, error = %e, "Failed to close tab after failed navigation");
        }
        Err(failure)
    }
}

/// An article page in its own target.
pub struct ChromeTab {
    page: Page,
}

impl ArticleTab for ChromeTab {
    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        let script = format!("document.querySelector({}) !== null", js_str(selector)?);
        eval(&self.page, script).await
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.page.close().await?;
        Ok(())
    }
}
