//! Site profile and crawl tuning.
//!
//! Everything site-specific (selectors, labels, the known category list) lives
//! in [`SiteProfile`] as plain data. The built-in profile targets Al Jadeed's
//! pushed-notifications page; a YAML file can override any subset of it.
//!
//! ```yaml
//! categories:
//!   - محليات
//!   - رياضة
//! load_more_label: المزيد
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Selector and label table for one news site.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteProfile {
    /// One notification tile in the feed.
    pub notification_item: String,
    /// Coarse `HH:MM` label inside a tile.
    pub notification_time: String,
    /// Anchor inside a tile that links to the article.
    pub notification_link: String,
    /// Visible text of the "load more" control.
    pub load_more_label: String,
    /// Elements that may carry the "load more" label.
    pub load_more_scope: String,
    /// Candidates inside these (site chrome, scripts) are never the control.
    pub load_more_exclude: String,

    pub article_title: String,
    /// Short description, matched on its stable id suffix.
    pub short_description: String,
    pub long_description: String,
    /// Long-description text from this marker onwards is a related-articles list.
    pub related_marker: String,
    /// Elements whose text is compared against `categories`.
    pub category_label: String,
    pub categories: Vec<String>,

    /// Overlays removed from the DOM outright.
    pub obstruction_removals: Vec<String>,
    /// Close buttons clicked if present.
    pub obstruction_clicks: Vec<String>,
    /// Button captions that accept the cookie banner.
    pub cookie_labels: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        let strings = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        SiteProfile {
            notification_item: ".card__item".to_string(),
            notification_time: ".card-date".to_string(),
            notification_link: ".card-title a".to_string(),
            load_more_label: "المزيد".to_string(),
            load_more_scope: "button, a, span, div".to_string(),
            load_more_exclude: "nav, header, footer, script, style, noscript".to_string(),
            article_title: "h1".to_string(),
            short_description: r#"[id$="lblShortDesc"]"#.to_string(),
            long_description: ".LongDesc".to_string(),
            related_marker: "مقالات ذات صلة".to_string(),
            category_label: "a".to_string(),
            categories: strings(&[
                "محليات",
                "عربي و دولي",
                "النشرة",
                "إقتصاد",
                "رياضة",
                "خاص الجديد",
                "فن و منوعات",
            ]),
            obstruction_removals: strings(&["#dvPushSoftImpRequest", ".push-notication-parent"]),
            obstruction_clicks: strings(&[".push-notification-close-icon"]),
            cookie_labels: strings(&["أوافق", "موافق", "Accept"]),
        }
    }
}

impl SiteProfile {
    /// Load a profile from YAML. Keys missing from the file keep their built-in values.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_yaml_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        let profile = Self::from_yaml_str(&raw)?;
        info!(categories = profile.categories.len(), "Loaded site profile");
        Ok(profile)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Exact match of a label against the known categories.
    pub fn match_category(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.categories
            .iter()
            .find(|c| c.as_str() == label)
            .map(String::as_str)
    }
}

/// Runtime knobs for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_url: Url,
    /// Articles published strictly before this end the crawl.
    pub until: NaiveDateTime,
    pub max_attempts: usize,
    pub retry_delay: Duration,
    /// Upper bound for every visibility/presence wait.
    pub wait_timeout: Duration,
    /// How long to look for the cookie banner before moving on.
    pub cookie_wait: Duration,
    pub poll_interval: Duration,
}

impl CrawlConfig {
    pub const MAX_ATTEMPTS: usize = 3;

    pub fn new(start_url: Url, until: NaiveDateTime) -> Self {
        CrawlConfig {
            start_url,
            until,
            max_attempts: Self::MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(10),
            cookie_wait: Duration::from_secs(1),
            poll_interval: Duration::from_millis(250),
        }
    }
}
