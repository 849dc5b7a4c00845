//! Field extraction from a rendered Al Jadeed article page.
//!
//! The article template carries:
//! - a single `<h1>` headline
//! - a `YYYY-MM-DD | HH:MM` publish stamp somewhere in the header
//! - breadcrumb links, one of which is the section (category) name
//! - a short description (the pushed notification text) and, for full
//!   stories, a long description followed by a related-articles list
//!
//! Extraction only reads the markup; it never touches the live page.

use crate::config::SiteProfile;
use crate::error::ExtractionError;
use crate::models::ArticleRecord;
use crate::utils::parse_selector;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};

static PUBLISHED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})\s*\|\s*(\d{1,2}:\d{2})").expect("static regex is valid")
});

const BLOCK_TAGS: [&str; 14] = [
    "p", "div", "br", "li", "ul", "ol", "section", "article", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Parse a `2025-11-18 | 13:57` stamp out of arbitrary surrounding text.
pub fn parse_published(text: &str) -> Option<NaiveDateTime> {
    let caps = PUBLISHED_RE.captures(text)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&caps[2], "%H:%M").ok()?;
    Some(date.and_time(time))
}

/// Extract a record from article HTML.
///
/// Fails with [`ExtractionError::NoContent`] when the short description is
/// missing or blank. A missing long description is not an error; the record is
/// flagged as notification-only instead.
pub fn extract_article(
    html: &str,
    url: &str,
    profile: &SiteProfile,
    scraped_at: NaiveDateTime,
) -> Result<ArticleRecord, ExtractionError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&parse_selector(&profile.article_title))
        .map(inline_text)
        .find(|t| !t.is_empty())
        .ok_or(ExtractionError::MissingTitle)?;

    let published_at = find_published(&document).ok_or(ExtractionError::MissingDate)?;
    let category = find_category(&document, profile);

    let short = document
        .select(&parse_selector(&profile.short_description))
        .next()
        .map(block_text)
        .filter(|s| !s.is_empty())
        .ok_or(ExtractionError::NoContent)?;

    let long = document
        .select(&parse_selector(&profile.long_description))
        .next()
        .map(block_text)
        .map(|text| strip_related(&text, &profile.related_marker))
        .filter(|s| !s.is_empty());

    let (body, is_notification_only) = match long {
        Some(long) => (format!("{short}\n\n{long}"), false),
        None => (short, true),
    };

    Ok(ArticleRecord {
        scraped_at,
        published_at,
        url: url.to_string(),
        title,
        body,
        category,
        is_notification_only,
    })
}

fn find_published(document: &Html) -> Option<NaiveDateTime> {
    // Prefer the element that owns the separator, then fall back to the whole page.
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| {
            el.children().any(|n| match n.value() {
                Node::Text(t) => t.contains('|'),
                _ => false,
            })
        })
        .find_map(|el| parse_published(&inline_text(el)))
        .or_else(|| parse_published(&inline_text(document.root_element())))
}

fn find_category(document: &Html, profile: &SiteProfile) -> String {
    document
        .select(&parse_selector(&profile.category_label))
        .find_map(|el| profile.match_category(&inline_text(el)).map(str::to_string))
        .unwrap_or_default()
}

fn strip_related(text: &str, marker: &str) -> String {
    if marker.is_empty() {
        return text.trim().to_string();
    }
    text.split(marker).next().unwrap_or_default().trim().to_string()
}

/// Text on one line, whitespace collapsed.
fn inline_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .join(" ")
}

/// Text with a line break after every block element, blank lines dropped.
fn block_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_block_text(el, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().join(" "))
        .filter(|line| !line.is_empty())
        .join("\n")
}

fn push_block_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    let name = child.value().name();
                    if name == "br" {
                        out.push('\n');
                        continue;
                    }
                    push_block_text(child, out);
                    if BLOCK_TAGS.contains(&name) {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}
