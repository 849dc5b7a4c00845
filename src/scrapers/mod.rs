//! Page-level scrapers for the Al Jadeed pushed-notifications feed.
//!
//! Scraping follows a two-phase pattern per feed page:
//!
//! 1. **Reading**: list the notification tiles on the feed ([`notifications`])
//! 2. **Extracting**: open each linked article and pull out its fields ([`article`])
//!
//! Before either can happen the feed page has to be cleared of overlays
//! ([`obstructions`]).
//!
//! | Module | Reads | Produces |
//! |--------|-------|----------|
//! | [`obstructions`] | live feed page | a usable feed, or a fatal timeout |
//! | [`notifications`] | feed HTML | `NotificationEntry` list + "load more" state |
//! | [`article`] | article HTML | `ArticleRecord` or `ExtractionError` |
//!
//! Markup lookups are driven by [`crate::config::SiteProfile`], so a template
//! change on the site is a profile change here.

pub mod article;
pub mod notifications;
pub mod obstructions;
