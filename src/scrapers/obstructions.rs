//! Dismiss the overlays that sit on top of the notification feed.
//!
//! Al Jadeed greets visitors with a push-permission prompt, its full-page
//! backdrop, and a cookie banner. None of them is guaranteed to appear, so each
//! removal is best effort. What is not optional is the feed itself: if the
//! tiles never become visible the page is unusable and the run ends.

use crate::browser::{wait_until, Browser};
use crate::config::{CrawlConfig, SiteProfile};
use crate::error::ScrapeError;
use tracing::{debug, info, instrument};

/// Remove known obstructions, then block until the feed is visible.
#[instrument(level = "info", skip_all)]
pub async fn clear_obstructions<B: Browser>(
    browser: &B,
    profile: &SiteProfile,
    config: &CrawlConfig,
) -> Result<(), ScrapeError> {
    remove_overlays(browser, profile).await;

    for selector in &profile.obstruction_clicks {
        match browser.click(selector).await {
            Ok(true) => info!(%selector, "Closed push notification popup"),
            Ok(false) => info!(%selector, "No push notification popup detected"),
            Err(e) => debug!(%selector, error = %e, "Popup close failed (ignored)"),
        }
    }

    // Closing the prompt can re-insert its backdrop.
    remove_overlays(browser, profile).await;

    let labels = &profile.cookie_labels;
    let accepted = wait_until(config.cookie_wait, config.poll_interval, move || async move {
        Ok(browser
            .click_text("button", "", labels)
            .await
            .unwrap_or(false))
    })
    .await
    .unwrap_or(false);
    if accepted {
        info!("Accepted cookie banner");
    } else {
        info!("No cookie banner found; continuing");
    }

    wait_for_feed(browser, profile, config).await
}

async fn remove_overlays<B: Browser>(browser: &B, profile: &SiteProfile) {
    for selector in &profile.obstruction_removals {
        match browser.remove_elements(selector).await {
            Ok(0) => debug!(%selector, "Overlay not present"),
            Ok(n) => info!(%selector, removed = n, "Removed overlay"),
            Err(e) => debug!(%selector, error = %e, "Overlay removal failed (ignored)"),
        }
    }
}

/// Block until at least one notification tile is visible.
pub async fn wait_for_feed<B: Browser>(
    browser: &B,
    profile: &SiteProfile,
    config: &CrawlConfig,
) -> Result<(), ScrapeError> {
    let selector = &profile.notification_item;
    let visible = wait_until(config.wait_timeout, config.poll_interval, move || async move {
        match browser.is_visible(selector).await {
            Ok(v) => Ok(v),
            Err(e) => {
                debug!(%selector, error = %e, "Visibility probe failed");
                Ok(false)
            }
        }
    })
    .await
    .unwrap_or(false);

    if visible {
        debug!(%selector, "Notification list visible");
        Ok(())
    } else {
        Err(ScrapeError::ObstructionTimeout {
            selector: selector.clone(),
            timeout: config.wait_timeout,
        })
    }
}
