//! Read notification tiles from the feed and drive its "load more" control.
//!
//! Tiles accumulate in the page: each "load more" click appends older
//! notifications below the ones already shown. The reader therefore takes the
//! number of tiles already handled and only yields the ones after it.

use crate::browser::{wait_until, Browser};
use crate::config::{CrawlConfig, SiteProfile};
use crate::error::ScrapeError;
use crate::models::NotificationEntry;
use crate::scrapers::obstructions::wait_for_feed;
use crate::utils::{parse_selector, truncate_for_log};
use itertools::Itertools;
use scraper::{ElementRef, Html, Node};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// New tiles found on the current render of the feed.
#[derive(Debug, Default)]
pub struct FeedPage {
    /// Entries for tiles at index `>= skip`, in display order.
    pub entries: Vec<NotificationEntry>,
    /// Total tiles rendered, including ones without a usable link.
    pub tile_count: usize,
    /// Whether an enabled "load more" control is present.
    pub has_more: bool,
}

/// Parse the feed markup.
pub fn read_notifications(
    html: &str,
    page_url: &Url,
    profile: &SiteProfile,
    skip: usize,
) -> FeedPage {
    let document = Html::parse_document(html);
    let item_sel = parse_selector(&profile.notification_item);
    let time_sel = parse_selector(&profile.notification_time);
    let link_sel = parse_selector(&profile.notification_link);

    let tiles: Vec<ElementRef> = document.select(&item_sel).collect();
    let mut entries = Vec::new();
    for (idx, tile) in tiles.iter().enumerate().skip(skip) {
        let time = tile
            .select(&time_sel)
            .next()
            .map(|e| collapse_text(e))
            .unwrap_or_default();

        let Some(link) = tile.select(&link_sel).next() else {
            warn!(index = idx, "Notification item without link, skipping");
            continue;
        };
        let Some(href) = link.value().attr("href").filter(|h| !h.trim().is_empty()) else {
            warn!(index = idx, "Notification link missing URL, skipping");
            continue;
        };
        let url = match page_url.join(href.trim()) {
            Ok(u) => u.to_string(),
            Err(e) => {
                warn!(index = idx, %href, error = %e, "Unresolvable notification link, skipping");
                continue;
            }
        };

        entries.push(NotificationEntry {
            time,
            title: collapse_text(link),
            url,
        });
    }

    FeedPage {
        entries,
        tile_count: tiles.len(),
        has_more: has_load_more(&document, profile),
    }
}

/// Whitespace-normalized text of an element.
fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .join(" ")
}

fn own_text(el: &ElementRef<'_>) -> String {
    el.children()
        .filter_map(|n| match n.value() {
            Node::Text(t) => Some(&**t),
            _ => None,
        })
        .collect()
}

const NOT_RENDERED: [&str; 3] = ["script", "style", "noscript"];

/// Hidden by markup alone: inside a non-rendered element, `hidden`, or an
/// inline `display: none` / `visibility: hidden` on itself or an ancestor.
fn hidden_in_markup(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| {
            let v = e.value();
            NOT_RENDERED.contains(&v.name())
                || v.attr("hidden").is_some()
                || v.attr("style").is_some_and(|style| {
                    let style = style
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect::<String>()
                        .to_ascii_lowercase();
                    style.contains("display:none") || style.contains("visibility:hidden")
                })
        })
}

fn has_load_more(document: &Html, profile: &SiteProfile) -> bool {
    let scope = parse_selector(&profile.load_more_scope);
    let exclude = Some(profile.load_more_exclude.trim())
        .filter(|css| !css.is_empty())
        .map(parse_selector);
    let excluded = |el: ElementRef<'_>| {
        exclude.as_ref().is_some_and(|ex| {
            std::iter::once(el)
                .chain(el.ancestors().filter_map(ElementRef::wrap))
                .any(|e| ex.matches(&e))
        })
    };

    document.select(&scope).any(|el| {
        let v = el.value();
        v.attr("disabled").is_none()
            && v.attr("aria-disabled") != Some("true")
            && !hidden_in_markup(el)
            && !excluded(el)
            && own_text(&el).contains(&profile.load_more_label)
    })
}

/// Read the tiles after `skip` from the live feed.
#[instrument(level = "debug", skip_all, fields(offset = skip))]
pub async fn collect_notifications<B: Browser>(
    browser: &B,
    page_url: &Url,
    profile: &SiteProfile,
    skip: usize,
) -> Result<FeedPage, ScrapeError> {
    let html = browser
        .content()
        .await
        .map_err(|e| ScrapeError::navigation(page_url.as_str(), e))?;
    let page = read_notifications(&html, page_url, profile, skip);
    info!(
        visible = page.tile_count,
        new = page.entries.len(),
        has_more = page.has_more,
        "Collected notification items"
    );
    for (i, entry) in page.entries.iter().enumerate() {
        debug!(
            index = skip + i + 1,
            time = %entry.time,
            title = %truncate_for_log(&entry.title, 80),
            url = %entry.url,
            "Notification"
        );
    }
    Ok(page)
}

/// Click "load more" and wait for older tiles to appear.
///
/// Returns `false` when the control could not be clicked or no new tiles
/// rendered within the wait timeout; both mean the feed is exhausted.
#[instrument(level = "info", skip_all, fields(previous = tile_count))]
pub async fn load_more<B: Browser>(
    browser: &B,
    page_url: &Url,
    profile: &SiteProfile,
    config: &CrawlConfig,
    tile_count: usize,
) -> Result<bool, ScrapeError> {
    let labels = [profile.load_more_label.clone()];
    let clicked = browser
        .click_text(&profile.load_more_scope, &profile.load_more_exclude, &labels)
        .await
        .map_err(|e| ScrapeError::navigation(page_url.as_str(), e))?;
    if !clicked {
        info!("'Load more' control not clickable; reached end of notifications");
        return Ok(false);
    }

    wait_for_feed(browser, profile, config).await?;

    let grew = wait_until(config.wait_timeout, config.poll_interval, move || async move {
        let html = browser.content().await?;
        Ok(read_notifications(&html, page_url, profile, 0).tile_count > tile_count)
    })
    .await
    .map_err(|e| ScrapeError::navigation(page_url.as_str(), e))?;

    if grew {
        info!("Loaded older notifications");
    } else {
        warn!(timeout = ?config.wait_timeout, "No new notifications appeared after 'load more'");
    }
    Ok(grew)
}
